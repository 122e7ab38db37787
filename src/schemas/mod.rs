mod documents;
pub use documents::*;

mod messages;
pub use messages::*;

mod stream;
pub use stream::*;

mod tools_openai_like;
pub use tools_openai_like::*;
