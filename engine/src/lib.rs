mod collection;
mod engine;
mod gate;
mod resolve;
mod score;

pub use collection::*;

pub use engine::*;

pub use gate::*;

pub use resolve::*;

pub use score::*;

#[cfg(test)]
mod tests;

use tracing::Level;
use tracing_subscriber::FmtSubscriber;

pub fn setup_logging() {
    let subscriber = FmtSubscriber::builder().with_max_level(Level::INFO).finish();

    tracing::subscriber::set_global_default(subscriber).expect("setting default subscriber failed");
}
