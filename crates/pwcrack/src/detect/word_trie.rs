//! Per-alphabet word trie: counts observed dictionary words with a
//! minimum-occurrence threshold for promotion to the terminal set.

use crate::types::CommonHashMap;

#[derive(Debug, Default)]
struct WordTrieNode {
    children: CommonHashMap<char, WordTrieNode>,
    count: u64,
    is_word: bool,
}

/// A prefix tree over case-folded words, counting occurrences.
#[derive(Debug)]
pub struct WordTrie {
    root: WordTrieNode,
    needed_appear: u64,
}

impl WordTrie {
    /// Construct an empty trie with the given promotion threshold.
    pub fn new(needed_appear: u64) -> Self {
        Self {
            root: WordTrieNode::default(),
            needed_appear,
        }
    }

    /// Commit one observation of `word`, incrementing its leaf count by
    /// `1 + offset` and marking it as a word boundary.
    pub fn commit_word(&mut self, word: &str, offset: u64) {
        let mut node = &mut self.root;
        for c in word.chars() {
            node = node.children.entry(c).or_default();
        }
        node.count += 1 + offset;
        node.is_word = true;
    }

    /// Pre-train `word` so it is promoted regardless of how rarely it is
    /// later observed (offset = `needed_appear`).
    pub fn pretrain_word(&mut self, word: &str) {
        self.commit_word(word, self.needed_appear);
    }

    /// The observed count for `word`, if it has ever been committed.
    pub fn count(&self, word: &str) -> Option<u64> {
        let mut node = &self.root;
        for c in word.chars() {
            node = node.children.get(&c)?;
        }
        if node.is_word {
            Some(node.count)
        } else {
            None
        }
    }

    /// All words whose count has reached the promotion threshold.
    pub fn promoted_words(&self) -> Vec<(String, u64)> {
        let mut out = Vec::new();
        let mut prefix = String::new();
        Self::collect(&self.root, &mut prefix, &mut out);
        out.into_iter()
            .filter(|(_, count)| *count >= self.needed_appear)
            .collect()
    }

    fn collect(node: &WordTrieNode, prefix: &mut String, out: &mut Vec<(String, u64)>) {
        if node.is_word {
            out.push((prefix.clone(), node.count));
        }
        for (&c, child) in &node.children {
            prefix.push(c);
            Self::collect(child, prefix, out);
            prefix.pop();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn promotion_requires_threshold() {
        let mut trie = WordTrie::new(3);
        trie.commit_word("cat", 0);
        trie.commit_word("cat", 0);
        assert!(trie.promoted_words().is_empty());
        trie.commit_word("cat", 0);
        assert_eq!(trie.promoted_words(), vec![("cat".to_string(), 3)]);
    }

    #[test]
    fn pretrain_forces_promotion() {
        let mut trie = WordTrie::new(5);
        trie.pretrain_word("dog");
        assert_eq!(trie.count("dog"), Some(6));
        assert_eq!(trie.promoted_words(), vec![("dog".to_string(), 6)]);
    }
}
