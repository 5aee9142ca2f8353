//! core::interval
//!
//! Interval tree over row spans.
//!
//! # Design
//!
//! An AVL tree keyed by the low end of each interval, where every node also
//! caches the largest high end in its subtree. Overlap queries skip any
//! subtree whose cached maximum lies below the query, and any right subtree
//! whose keys start above it, so a query costs `O(log n + k)` for `k` hits.
//!
//! Nodes live in a `Vec` arena and link by index. Nothing is ever removed:
//! a layout pass builds a tree, queries it, and throws it away.
//!
//! Intervals are closed: `[low, high]` overlaps `[a, b]` iff
//! `low <= b && high >= a`.
//!
//! # Example
//!
//! ```
//! use lanegraph::core::interval::IntervalTree;
//!
//! let mut tree = IntervalTree::new();
//! tree.insert(1, 3, "a");
//! tree.insert(5, 8, "b");
//! tree.insert(2, 6, "c");
//!
//! let mut hits: Vec<_> = tree.search(4, 4).into_iter().copied().collect();
//! hits.sort();
//! assert_eq!(hits, vec!["c"]);
//! ```

#[derive(Debug, Clone)]
struct Node<T> {
    low: usize,
    high: usize,
    /// Largest `high` in the subtree rooted here.
    max: usize,
    height: i32,
    left: Option<usize>,
    right: Option<usize>,
    value: T,
}

/// A balanced interval tree mapping closed `usize` ranges to values.
#[derive(Debug, Clone)]
pub struct IntervalTree<T> {
    nodes: Vec<Node<T>>,
    root: Option<usize>,
}

impl<T> Default for IntervalTree<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> IntervalTree<T> {
    /// Create an empty tree.
    pub fn new() -> Self {
        Self {
            nodes: Vec::new(),
            root: None,
        }
    }

    /// Number of stored intervals.
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// Check if the tree holds no intervals.
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Insert the closed interval `[low, high]` carrying `value`.
    ///
    /// Endpoints given in reverse order are swapped.
    pub fn insert(&mut self, low: usize, high: usize, value: T) {
        let (low, high) = if low <= high { (low, high) } else { (high, low) };
        let idx = self.nodes.len();
        self.nodes.push(Node {
            low,
            high,
            max: high,
            height: 1,
            left: None,
            right: None,
            value,
        });
        let root = self.root;
        self.root = Some(self.insert_at(root, idx));
    }

    /// All values whose interval overlaps `[low, high]`.
    ///
    /// Results come back in no particular order.
    pub fn search(&self, low: usize, high: usize) -> Vec<&T> {
        let (low, high) = if low <= high { (low, high) } else { (high, low) };
        let mut hits = Vec::new();
        let mut stack: Vec<usize> = self.root.into_iter().collect();

        while let Some(n) = stack.pop() {
            let node = &self.nodes[n];
            if node.max < low {
                continue;
            }
            if node.low <= high && node.high >= low {
                hits.push(&node.value);
            }
            if let Some(left) = node.left {
                stack.push(left);
            }
            // Right keys are >= node.low; none can start inside the query
            // once node.low is already past it.
            if node.low <= high {
                if let Some(right) = node.right {
                    stack.push(right);
                }
            }
        }

        hits
    }

    /// Iterate every `(low, high, value)` triple in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = (usize, usize, &T)> {
        self.nodes.iter().map(|n| (n.low, n.high, &n.value))
    }

    fn insert_at(&mut self, at: Option<usize>, idx: usize) -> usize {
        let Some(n) = at else {
            return idx;
        };
        if self.nodes[idx].low < self.nodes[n].low {
            let left = self.nodes[n].left;
            let child = self.insert_at(left, idx);
            self.nodes[n].left = Some(child);
        } else {
            let right = self.nodes[n].right;
            let child = self.insert_at(right, idx);
            self.nodes[n].right = Some(child);
        }
        self.rebalance(n)
    }

    fn height(&self, n: Option<usize>) -> i32 {
        n.map_or(0, |i| self.nodes[i].height)
    }

    fn update(&mut self, n: usize) {
        let (left, right) = (self.nodes[n].left, self.nodes[n].right);
        let mut max = self.nodes[n].high;
        for child in [left, right].into_iter().flatten() {
            max = max.max(self.nodes[child].max);
        }
        self.nodes[n].max = max;
        self.nodes[n].height = 1 + self.height(left).max(self.height(right));
    }

    fn balance_factor(&self, n: usize) -> i32 {
        self.height(self.nodes[n].left) - self.height(self.nodes[n].right)
    }

    fn rotate_right(&mut self, n: usize) -> usize {
        let Some(pivot) = self.nodes[n].left else {
            return n;
        };
        self.nodes[n].left = self.nodes[pivot].right;
        self.nodes[pivot].right = Some(n);
        self.update(n);
        self.update(pivot);
        pivot
    }

    fn rotate_left(&mut self, n: usize) -> usize {
        let Some(pivot) = self.nodes[n].right else {
            return n;
        };
        self.nodes[n].right = self.nodes[pivot].left;
        self.nodes[pivot].left = Some(n);
        self.update(n);
        self.update(pivot);
        pivot
    }

    fn rebalance(&mut self, n: usize) -> usize {
        self.update(n);
        let balance = self.balance_factor(n);

        if balance > 1 {
            if let Some(left) = self.nodes[n].left {
                if self.balance_factor(left) < 0 {
                    let rotated = self.rotate_left(left);
                    self.nodes[n].left = Some(rotated);
                }
            }
            return self.rotate_right(n);
        }
        if balance < -1 {
            if let Some(right) = self.nodes[n].right {
                if self.balance_factor(right) > 0 {
                    let rotated = self.rotate_right(right);
                    self.nodes[n].right = Some(rotated);
                }
            }
            return self.rotate_left(n);
        }
        n
    }
}
