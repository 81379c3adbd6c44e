//! Reading time estimation

use super::ContentBlock;

/// Default reading speed
pub const WORDS_PER_MINUTE: usize = 200;

/// Count words by splitting on the space character.
///
/// Two consecutive spaces produce an extra (empty) word and newlines do not
/// separate words. Only the empty string counts as zero words.
pub fn count_words(text: &str) -> usize {
    if text.is_empty() {
        0
    } else {
        text.split(' ').count()
    }
}

/// Total words of a post: title, section headings and section bodies
pub fn total_words(title: &str, content: &[ContentBlock]) -> usize {
    let content_words: usize = content
        .iter()
        .map(|block| count_words(block.heading()) + count_words(&block.body.as_text()))
        .sum();

    count_words(title) + content_words
}

/// Minutes needed to read a post, rounded up. An empty post reads in 0 minutes.
pub fn reading_time(title: &str, content: &[ContentBlock], words_per_minute: usize) -> usize {
    total_words(title, content).div_ceil(words_per_minute.max(1))
}
