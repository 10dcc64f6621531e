use crate::progress::TransferStats;

/// One write request: a slice of the local file and where it lands.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WriteChunk {
    /// Byte offset within the remote file.
    pub offset: u64,
    /// Payload, at most the negotiated max write size.
    pub data: Vec<u8>,
}

/// Result of a single successful file write.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WriteOutcome {
    /// Every chunk reached the server.
    Transferred(TransferStats),
    /// The remote file already existed and skipping is enabled.
    Skipped,
}
