/// Per-context (user) lists of `(item, score)` pairs.
///
/// For a ground truth the score is the observed value (a rating or a
/// count); for predictions it is the model's score, and ranking metrics
/// read each list in its stored order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RecommendedList {
    lists: Vec<Vec<(usize, f64)>>,
}

impl RecommendedList {
    pub fn new(num_contexts: usize) -> Self {
        RecommendedList {
            lists: vec![vec![]; num_contexts],
        }
    }

    pub fn from_lists(lists: Vec<Vec<(usize, f64)>>) -> Self {
        RecommendedList { lists }
    }

    /// Group `(context, item, score)` triplets by context
    pub fn from_triplets<I>(num_contexts: usize, triplets: I) -> Self
    where
        I: IntoIterator<Item = (usize, usize, f64)>,
    {
        let mut ret = Self::new(num_contexts);
        for (context, item, score) in triplets {
            ret.add(context, item, score);
        }
        ret
    }

    /// Append an entry; grows the number of contexts if needed
    pub fn add(&mut self, context: usize, item: usize, score: f64) {
        if context >= self.lists.len() {
            self.lists.resize(context + 1, vec![]);
        }
        self.lists[context].push((item, score));
    }

    pub fn num_contexts(&self) -> usize {
        self.lists.len()
    }

    /// Total number of entries
    pub fn len(&self) -> usize {
        self.lists.iter().map(|x| x.len()).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.lists.iter().all(|x| x.is_empty())
    }

    /// Entries of one context; empty beyond the last context
    pub fn context(&self, context: usize) -> &[(usize, f64)] {
        self.lists.get(context).map(|x| x.as_slice()).unwrap_or(&[])
    }

    pub fn iter(&self) -> impl Iterator<Item = (usize, &[(usize, f64)])> {
        self.lists
            .iter()
            .enumerate()
            .map(|(c, list)| (c, list.as_slice()))
    }
}
