//! Bounding-volume tree over indexed boxes.
//!
//! Median split on the longest axis of the centroid bounds, as used by
//! instanced batches and landscape surfaces.

use usdx_math::{Aabb, Interval, Ray};

/// Maximum items per leaf before splitting.
const LEAF_MAX_SIZE: usize = 4;

#[derive(Clone, Debug)]
enum Node {
    Branch {
        left: Box<Node>,
        right: Box<Node>,
        bounds: Aabb,
    },
    Leaf {
        items: Vec<(usize, Aabb)>,
        bounds: Aabb,
    },
}

impl Node {
    fn bounds(&self) -> &Aabb {
        match self {
            Node::Branch { bounds, .. } | Node::Leaf { bounds, .. } => bounds,
        }
    }

    fn build(mut items: Vec<(usize, Aabb)>) -> Node {
        let mut bounds = Aabb::empty();
        for (_, b) in &items {
            bounds.merge(b);
        }

        if items.len() <= LEAF_MAX_SIZE {
            return Node::Leaf { items, bounds };
        }

        let mut centroids = Aabb::empty();
        for (_, b) in &items {
            centroids.include(b.center());
        }
        let axis = centroids.longest_axis();

        items.sort_unstable_by(|(_, a), (_, b)| a.center()[axis].total_cmp(&b.center()[axis]));

        let right = items.split_off(items.len() / 2);
        Node::Branch {
            left: Box::new(Node::build(items)),
            right: Box::new(Node::build(right)),
            bounds,
        }
    }

    fn query(&self, ray: &Ray, ray_t: Interval, out: &mut Vec<usize>) {
        if !self.bounds().hit(ray, ray_t) {
            return;
        }
        match self {
            Node::Branch { left, right, .. } => {
                left.query(ray, ray_t, out);
                right.query(ray, ray_t, out);
            }
            Node::Leaf { items, .. } => out.extend(
                items
                    .iter()
                    .filter(|(_, b)| b.hit(ray, ray_t))
                    .map(|(i, _)| *i),
            ),
        }
    }
}

/// A tree over item bounds, indexed by position in the input slice.
#[derive(Clone, Debug, Default)]
pub struct ClusterTree {
    root: Option<Node>,
    len: usize,
}

impl ClusterTree {
    pub fn build(bounds: &[Aabb]) -> Self {
        let items: Vec<(usize, Aabb)> = bounds
            .iter()
            .copied()
            .enumerate()
            .filter(|(_, b)| !b.is_empty())
            .collect();
        let len = items.len();
        let root = if items.is_empty() {
            None
        } else {
            Some(Node::build(items))
        };
        Self { root, len }
    }

    /// Number of items in the tree.
    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn bounds(&self) -> Aabb {
        self.root.as_ref().map(|n| *n.bounds()).unwrap_or_default()
    }

    /// Items whose bounds the ray crosses within `ray_t`.
    pub fn query_ray(&self, ray: &Ray, ray_t: Interval) -> Vec<usize> {
        let mut out = Vec::new();
        if let Some(root) = &self.root {
            root.query(ray, ray_t, &mut out);
        }
        out
    }
}
