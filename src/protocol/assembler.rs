use std::mem;

use bytes::BytesMut;

use crate::{
    error::ProtocolError,
    protocol::message::{UploadMetadata, UploadRequest},
    storage::Payload,
};

/// Observable phase of an [`UploadAssembler`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AssemblyState {
    /// Nothing received yet; the next message must be metadata.
    AwaitingMetadata,
    /// Metadata received; chunks are being appended.
    Receiving,
    /// A protocol violation occurred; the buffer has been released.
    Failed,
}

#[derive(Debug)]
enum State {
    AwaitingMetadata,
    Receiving {
        metadata: UploadMetadata,
        buffer: BytesMut,
    },
    Failed,
}

/// Reassembles one upload stream into a [`Payload`].
///
/// The assembler owns the payload buffer for the lifetime of the stream. Any
/// violation drops the buffer immediately, and dropping the assembler releases
/// it on every other exit path.
#[derive(Debug)]
pub struct UploadAssembler {
    state: State,
}

impl Default for UploadAssembler {
    fn default() -> Self {
        Self::new()
    }
}

impl UploadAssembler {
    /// Creates an assembler waiting for metadata.
    pub fn new() -> Self {
        Self {
            state: State::AwaitingMetadata,
        }
    }

    /// Returns the current phase.
    pub fn state(&self) -> AssemblyState {
        match self.state {
            State::AwaitingMetadata => AssemblyState::AwaitingMetadata,
            State::Receiving { .. } => AssemblyState::Receiving,
            State::Failed => AssemblyState::Failed,
        }
    }

    /// Number of payload bytes buffered so far.
    pub fn received_bytes(&self) -> usize {
        match &self.state {
            State::Receiving { buffer, .. } => buffer.len(),
            _ => 0,
        }
    }

    /// Applies the next message of the stream.
    pub fn push(&mut self, request: UploadRequest) -> Result<(), ProtocolError> {
        match request {
            UploadRequest::Metadata(metadata) => match self.state {
                State::AwaitingMetadata => {
                    self.state = State::Receiving {
                        metadata,
                        buffer: BytesMut::new(),
                    };
                    Ok(())
                }
                State::Receiving { .. } => self.fail(ProtocolError::DuplicateMetadata),
                State::Failed => Err(ProtocolError::StreamFailed),
            },
            UploadRequest::ChunkData(chunk) => match self.state {
                State::Receiving { ref mut buffer, .. } => {
                    buffer.extend_from_slice(&chunk);
                    Ok(())
                }
                State::AwaitingMetadata => self.fail(ProtocolError::ChunkBeforeMetadata),
                State::Failed => Err(ProtocolError::StreamFailed),
            },
        }
    }

    /// Consumes the assembler at explicit stream completion.
    pub fn finish(mut self) -> Result<Payload, ProtocolError> {
        match mem::replace(&mut self.state, State::Failed) {
            State::Receiving { metadata, buffer } => Ok(Payload {
                name: metadata.name,
                content_type: metadata.content_type,
                bytes: buffer.freeze(),
            }),
            State::AwaitingMetadata => Err(ProtocolError::MissingMetadata),
            State::Failed => Err(ProtocolError::StreamFailed),
        }
    }

    fn fail(&mut self, err: ProtocolError) -> Result<(), ProtocolError> {
        self.state = State::Failed;
        Err(err)
    }
}
