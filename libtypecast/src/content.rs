//! Thread splitting for draft content
//!
//! Draft text is written as a single block. Four consecutive newlines mark a
//! break between posts in a thread; anything shorter is an ordinary paragraph
//! break and stays inside the post.

/// Canonical delimiter between posts in a thread
pub const THREAD_DELIMITER: &str = "\n\n\n\n";

/// Split a block of text into the ordered posts of a thread
///
/// Each segment is trimmed. Segments that are empty after trimming (leading or
/// trailing delimiters, or runs of eight or more newlines) produce no post.
/// Text without a delimiter yields a single post. Empty or whitespace-only
/// input yields no posts at all.
///
/// # Examples
///
/// ```
/// use libtypecast::content::split_posts;
///
/// let posts = split_posts("Tweet one\n\n\n\nTweet two");
/// assert_eq!(posts, vec!["Tweet one", "Tweet two"]);
///
/// // Paragraph breaks do not start a new post
/// let posts = split_posts("First paragraph\n\nSecond paragraph");
/// assert_eq!(posts, vec!["First paragraph\n\nSecond paragraph"]);
/// ```
pub fn split_posts(raw: &str) -> Vec<String> {
    let normalized = raw.replace("\r\n", "\n");

    normalized
        .split(THREAD_DELIMITER)
        .map(str::trim)
        .filter(|segment| !segment.is_empty())
        .map(str::to_string)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_single_post_without_delimiter() {
        assert_eq!(split_posts("Hello world"), vec!["Hello world"]);
    }

    #[test]
    fn test_split_two_posts() {
        assert_eq!(
            split_posts("Tweet one\n\n\n\nTweet two"),
            vec!["Tweet one", "Tweet two"]
        );
    }

    #[test]
    fn test_k_delimiters_give_k_plus_one_posts_in_order() {
        let segments = ["first", "second", "third", "fourth", "fifth"];
        for k in 0..segments.len() {
            let text = segments[..=k].join(THREAD_DELIMITER);
            let posts = split_posts(&text);
            assert_eq!(posts.len(), k + 1, "text: {:?}", text);
            assert_eq!(posts, segments[..=k].to_vec());
        }
    }

    #[test]
    fn test_fewer_than_four_newlines_do_not_split() {
        for n in 1..4 {
            let text = format!("alpha{}beta", "\n".repeat(n));
            let posts = split_posts(&text);
            assert_eq!(posts.len(), 1, "{} newlines must not split", n);
            assert_eq!(posts[0], text);
        }
    }

    #[test]
    fn test_exactly_four_newlines_split() {
        assert_eq!(split_posts("alpha\n\n\n\nbeta"), vec!["alpha", "beta"]);
    }

    #[test]
    fn test_five_to_seven_newlines_split_once() {
        for n in 5..8 {
            let text = format!("alpha{}beta", "\n".repeat(n));
            assert_eq!(split_posts(&text), vec!["alpha", "beta"], "{} newlines", n);
        }
    }

    #[test]
    fn test_segments_are_trimmed() {
        assert_eq!(
            split_posts("  one  \n\n\n\n\t two \t"),
            vec!["one", "two"]
        );
    }

    #[test]
    fn test_leading_and_trailing_delimiters_are_dropped() {
        assert_eq!(
            split_posts("\n\n\n\none\n\n\n\ntwo\n\n\n\n"),
            vec!["one", "two"]
        );
    }

    #[test]
    fn test_interior_content_is_never_dropped() {
        let posts = split_posts("a\n\n\n\nb\n\n\n\n\n\n\n\nc");
        assert_eq!(posts, vec!["a", "b", "c"]);
    }

    #[test]
    fn test_paragraph_breaks_inside_posts_are_kept() {
        let posts = split_posts("p1\n\np2\n\n\n\nq1\nq2");
        assert_eq!(posts, vec!["p1\n\np2", "q1\nq2"]);
    }

    #[test]
    fn test_crlf_line_endings() {
        assert_eq!(
            split_posts("one\r\n\r\n\r\n\r\ntwo"),
            vec!["one", "two"]
        );
        assert_eq!(split_posts("one\r\n\r\ntwo"), vec!["one\n\ntwo"]);
    }

    #[test]
    fn test_empty_input_has_no_posts() {
        assert!(split_posts("").is_empty());
        assert!(split_posts("   \n\n\n\n  ").is_empty());
    }
}
