pub mod model;
pub mod time_model;

pub use model::{ContentType, Document, Paragraph, Question};
