//! Line-oriented redirector helper: framing, parsing, the worker pool and the
//! single reply writer.
pub mod dispatcher;
pub mod framer;
pub mod protocol;
pub mod worker_pool;
pub mod writer;

pub use dispatcher::{DispatchSummary, Dispatcher};
pub use framer::{LineFramer, MAX_LINE_BYTES};
pub use protocol::{parse_line, Frame, ReplyFormatter};
pub use worker_pool::WorkerPool;
pub use writer::spawn_reply_writer;
