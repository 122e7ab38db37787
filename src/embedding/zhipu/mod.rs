mod zhipu_embedder;
pub use zhipu_embedder::*;
