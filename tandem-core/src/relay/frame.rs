//! Frame boundary heuristic
//!
//! Peers exchange frames of the form
//!
//! ```text
//! ┌──────┬──────┬─────────┬──────┬──────────────┐
//! │ 0xAA │  ??  │ len (N) │  ??  │ N data bytes │
//! └──────┴──────┴─────────┴──────┴──────────────┘
//! ```
//!
//! Nothing here validates a frame. The rules only decide where a buffered
//! run of bytes most likely ends, so diagnostics line up with messages.

/// First byte of every frame
pub const SYNC_BYTE: u8 = 0xAA;

/// Fixed header size; byte 2 carries the payload length
pub const HEADER_LEN: usize = 4;

/// Largest possible frame: header plus a 255 byte payload
pub const MAX_MESSAGE_LEN: usize = HEADER_LEN + u8::MAX as usize;

/// Quiet time after which a partial buffer is flushed
pub const IDLE_FLUSH_MS: u32 = 45;

/// Why a buffer was flushed
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum FlushReason {
    /// Buffer reached [`MAX_MESSAGE_LEN`]
    SizeLimit,
    /// Buffer holds exactly the length its header declares
    FrameComplete,
    /// A sync byte arrived on top of a headless partial buffer
    Resync,
    /// Nothing arrived for [`IDLE_FLUSH_MS`]
    Idle,
    /// The other direction started relaying
    PeerActivity,
    /// A signal line changed level
    PinChange,
}

/// Check if `byte` starts a new frame over a stale partial one
pub fn is_resync(buffer: &[u8], byte: u8) -> bool {
    byte == SYNC_BYTE && buffer.first().is_some_and(|&first| first != SYNC_BYTE)
}

/// Total frame length announced by a buffered header
pub fn declared_len(buffer: &[u8]) -> Option<usize> {
    if buffer.len() < HEADER_LEN || buffer[0] != SYNC_BYTE {
        return None;
    }
    Some(buffer[2] as usize + HEADER_LEN)
}

/// Flush decision after appending a byte
pub fn flush_reason(buffer: &[u8]) -> Option<FlushReason> {
    if buffer.len() >= MAX_MESSAGE_LEN {
        Some(FlushReason::SizeLimit)
    } else if declared_len(buffer).is_some_and(|len| buffer.len() >= len) {
        Some(FlushReason::FrameComplete)
    } else {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_max_message_len() {
        assert_eq!(MAX_MESSAGE_LEN, 259);
    }

    #[test]
    fn test_resync() {
        assert!(!is_resync(&[], SYNC_BYTE));
        assert!(!is_resync(&[SYNC_BYTE, 1], SYNC_BYTE));
        assert!(is_resync(&[0x10, 0x20], SYNC_BYTE));
        assert!(!is_resync(&[0x10, 0x20], 0x30));
    }

    #[test]
    fn test_declared_len() {
        assert_eq!(declared_len(&[SYNC_BYTE, 0, 2]), None);
        assert_eq!(declared_len(&[SYNC_BYTE, 0, 2, 0]), Some(6));
        assert_eq!(declared_len(&[0x55, 0, 2, 0]), None);
    }

    #[test]
    fn test_flush_reason() {
        assert_eq!(flush_reason(&[SYNC_BYTE, 0, 1, 0]), None);
        assert_eq!(
            flush_reason(&[SYNC_BYTE, 0, 1, 0, 9]),
            Some(FlushReason::FrameComplete)
        );
        // Empty payload completes with the header
        assert_eq!(
            flush_reason(&[SYNC_BYTE, 0, 0, 0]),
            Some(FlushReason::FrameComplete)
        );
        assert_eq!(flush_reason(&[0u8; 258]), None);
        assert_eq!(flush_reason(&[0u8; 259]), Some(FlushReason::SizeLimit));
    }
}
