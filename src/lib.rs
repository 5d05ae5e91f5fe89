pub mod annotate;
pub mod cache;
pub mod extract;
pub mod handlers;
pub mod overlay;
pub mod resolver;
pub mod session;
pub mod source;
pub mod throttle;

pub use annotate::{AnnotatedDocument, AnnotatedSpan, Annotator, Segment, SpanSource};
pub use cache::DefinitionCache;
pub use extract::{ExtractionError, PlainTextExtractor, TextExtractor};
pub use handlers::{AppState, router};
pub use overlay::{Overlay, OverlayEvent, OverlayState, Point, Size, TagRef};
pub use resolver::{DEFAULT_LOOKUP_TIMEOUT, Resolution, Resolver};
pub use session::{PublishedDocument, RunError, RunStatus, Session};
pub use source::{DEFAULT_DICTIONARY_ENDPOINT, DefinitionSource, HttpDefinitionSource, LookupError};
pub use throttle::LookupThrottle;
