mod xinference_embedder;
pub use xinference_embedder::*;
