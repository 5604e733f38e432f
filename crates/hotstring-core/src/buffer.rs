use std::collections::VecDeque;

/// Most characters kept in the keystroke buffer
pub const BUFFER_CAPACITY: usize = 50;

/// Rolling record of the last characters the user typed
#[derive(Debug, Clone, Default)]
pub struct KeystrokeBuffer {
    chars: VecDeque<char>,
}

impl KeystrokeBuffer {
    pub fn new() -> Self {
        Self {
            chars: VecDeque::with_capacity(BUFFER_CAPACITY + 1),
        }
    }

    /// Append a character, dropping the oldest past capacity
    pub fn push(&mut self, c: char) {
        self.chars.push_back(c);
        while self.chars.len() > BUFFER_CAPACITY {
            self.chars.pop_front();
        }
    }

    pub fn pop(&mut self) -> Option<char> {
        self.chars.pop_back()
    }

    pub fn clear(&mut self) {
        self.chars.clear();
    }

    pub fn len(&self) -> usize {
        self.chars.len()
    }

    pub fn is_empty(&self) -> bool {
        self.chars.is_empty()
    }

    pub fn as_string(&self) -> String {
        self.chars.iter().collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn keeps_only_the_most_recent_characters() {
        let mut buffer = KeystrokeBuffer::new();
        for c in "abcdefghijklmnopqrstuvwxyz".chars().cycle().take(130) {
            buffer.push(c);
            assert!(buffer.len() <= BUFFER_CAPACITY);
        }
        assert_eq!(buffer.len(), BUFFER_CAPACITY);
        assert!(buffer.as_string().ends_with("opqrstuvwxyz"));
    }

    #[test]
    fn pop_removes_last_character() {
        let mut buffer = KeystrokeBuffer::new();
        assert_eq!(buffer.pop(), None);
        buffer.push('a');
        buffer.push('é');
        assert_eq!(buffer.pop(), Some('é'));
        assert_eq!(buffer.as_string(), "a");
    }
}
