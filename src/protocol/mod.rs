/// Upload stream assembly state machine.
pub mod assembler;
/// Wire message types.
pub mod message;

pub use assembler::{AssemblyState, UploadAssembler};
pub use message::{DeleteRequest, ObjectDescriptor, UploadMetadata, UploadRequest};

/// Chunk size used by clients when splitting a payload (4 KiB).
pub const DEFAULT_CHUNK_SIZE: usize = 4 * 1024;
