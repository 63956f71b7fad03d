//! Collection of inline image data delivered one method word at a time.

/// Transfers larger than this many words are refused.
pub const MAX_TRANSFER_WORDS: usize = 4 * 1024 * 1024;

/// Reusable word buffer for engines that receive pixels through data methods. The allocation is
/// kept across transfers.
#[derive(Debug, Clone, Default)]
pub struct WordCollector {
    words: Vec<u32>,
    expected: usize,
}

impl WordCollector {
    /// Starts a new transfer of `count` words, discarding any partial one. Returns `false` when
    /// the transfer is empty or too large; data words are then ignored until the next start.
    pub fn start(&mut self, count: u64) -> bool {
        self.words.clear();
        self.expected = 0;
        let count = match usize::try_from(count) {
            Ok(count) if count <= MAX_TRANSFER_WORDS => count,
            _ => {
                tracing::warn!(words = count, "oversized image transfer rejected");
                return false;
            }
        };
        if count == 0 {
            return false;
        }
        self.words.reserve(count);
        self.expected = count;
        true
    }

    pub fn is_active(&self) -> bool {
        self.expected != 0
    }

    /// Appends one data word. Returns `true` when it completed the transfer.
    pub fn push(&mut self, word: u32) -> bool {
        if !self.is_active() {
            tracing::trace!(word = format_args!("0x{word:08x}"), "data word without transfer");
            return false;
        }
        self.words.push(word);
        if self.words.len() < self.expected {
            return false;
        }
        self.expected = 0;
        true
    }

    /// Moves the completed words out so a primitive can read them while the engine state is
    /// borrowed mutably. Hand the buffer back with [`WordCollector::restore`].
    pub fn take(&mut self) -> Vec<u32> {
        std::mem::take(&mut self.words)
    }

    pub fn restore(&mut self, mut words: Vec<u32>) {
        words.clear();
        self.words = words;
    }
}

/// Little-endian views over a word buffer. Indices past the end read as 0.
pub fn word_at(words: &[u32], index: u32) -> u32 {
    words.get(index as usize).copied().unwrap_or(0)
}

pub fn half_at(words: &[u32], index: u32) -> u32 {
    (word_at(words, index / 2) >> ((index % 2) * 16)) & 0xFFFF
}

pub fn byte_at(words: &[u32], index: u32) -> u32 {
    (word_at(words, index / 4) >> ((index % 4) * 8)) & 0xFF
}

/// Reads pixel `index` of a packed buffer of `bytes`-wide pixels.
pub fn pixel_at(words: &[u32], index: u32, bytes: u32) -> u32 {
    match bytes {
        1 => byte_at(words, index),
        2 => half_at(words, index),
        _ => word_at(words, index),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn collects_exact_word_count() {
        let mut c = WordCollector::default();
        assert!(c.start(2));
        assert!(!c.push(1));
        assert!(c.push(2));
        assert!(!c.is_active());
        let words = c.take();
        assert_eq!(words, vec![1, 2]);
        c.restore(words);
        // Not started again, so further data is ignored.
        assert!(!c.push(3));
    }

    #[test]
    fn rejects_empty_and_oversized_transfers() {
        let mut c = WordCollector::default();
        assert!(!c.start(0));
        assert!(!c.start(MAX_TRANSFER_WORDS as u64 + 1));
        assert!(!c.is_active());
    }

    #[test]
    fn packed_views() {
        let words = [0x4433_2211, 0x8877_6655];
        assert_eq!(half_at(&words, 1), 0x4433);
        assert_eq!(half_at(&words, 2), 0x6655);
        assert_eq!(byte_at(&words, 5), 0x66);
        assert_eq!(pixel_at(&words, 1, 4), 0x8877_6655);
        assert_eq!(pixel_at(&words, 9, 1), 0);
    }
}
