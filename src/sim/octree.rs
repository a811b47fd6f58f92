//! Octree over spacecraft bounding spheres
//!
//! Built from scratch every tick from the live spacecraft (they all move, so
//! there is nothing to update incrementally) and only used to narrow down
//! which spacecraft a projectile could possibly hit.

use glam::Vec3;

use super::collision::Aabb;

/// Something the octree can index
#[derive(Debug, Clone, Copy)]
pub struct OctreeItem<K> {
    pub key: K,
    pub center: Vec3,
    pub radius: f32,
}

impl<K> OctreeItem<K> {
    fn extent(&self) -> Aabb {
        Aabb::around(self.center, self.radius)
    }
}

#[derive(Debug)]
struct Node {
    /// Item indices (only filled for leaves)
    items: Vec<usize>,
    split: Vec3,
    /// Indexed by octant: bit 0 = +x, bit 1 = +y, bit 2 = +z
    children: [Option<Box<Node>>; 8],
}

impl Node {
    fn leaf(items: Vec<usize>) -> Self {
        Self {
            items,
            split: Vec3::ZERO,
            children: Default::default(),
        }
    }

    fn is_leaf(&self) -> bool {
        self.children.iter().all(Option::is_none)
    }

    fn build<K>(
        all: &[OctreeItem<K>],
        items: Vec<usize>,
        depth: u32,
        max_depth: u32,
        max_objects: usize,
    ) -> Self {
        if depth >= max_depth || items.len() <= max_objects {
            return Node::leaf(items);
        }

        let split = items.iter().map(|&i| all[i].center).sum::<Vec3>() / items.len() as f32;

        let mut buckets: [Vec<usize>; 8] = Default::default();
        for &i in &items {
            let extent = all[i].extent();
            for (octant, bucket) in buckets.iter_mut().enumerate() {
                if octant_overlaps(octant, split, &extent) {
                    bucket.push(i);
                }
            }
        }

        let mut children: [Option<Box<Node>>; 8] = Default::default();
        for (octant, bucket) in buckets.into_iter().enumerate() {
            if !bucket.is_empty() {
                children[octant] = Some(Box::new(Node::build(
                    all,
                    bucket,
                    depth + 1,
                    max_depth,
                    max_objects,
                )));
            }
        }

        Self {
            items: Vec::new(),
            split,
            children,
        }
    }

    fn collect(&self, query: &Aabb, out: &mut Vec<usize>) {
        if self.is_leaf() {
            out.extend_from_slice(&self.items);
            return;
        }
        for (octant, child) in self.children.iter().enumerate() {
            if let Some(child) = child {
                if octant_overlaps(octant, self.split, query) {
                    child.collect(query, out);
                }
            }
        }
    }
}

/// Whether `extent` reaches into the octant of `split` selected by `octant`
fn octant_overlaps(octant: usize, split: Vec3, extent: &Aabb) -> bool {
    (0..3).all(|axis| {
        if octant & (1 << axis) != 0 {
            extent.max[axis] >= split[axis]
        } else {
            extent.min[axis] <= split[axis]
        }
    })
}

/// Spatial index rebuilt once per tick
#[derive(Debug)]
pub struct Octree<K> {
    items: Vec<OctreeItem<K>>,
    root: Node,
    /// Box around every item (None when empty)
    boundary: Option<Aabb>,
}

impl<K: Copy> Octree<K> {
    pub fn new(items: Vec<OctreeItem<K>>, max_depth: u32, max_objects: usize) -> Self {
        let boundary = items
            .iter()
            .map(OctreeItem::extent)
            .reduce(|a, b| a.union(&b));
        let indices = (0..items.len()).collect();
        let root = Node::build(&items, indices, 0, max_depth, max_objects.max(1));
        Self {
            items,
            root,
            boundary,
        }
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn boundary(&self) -> Option<Aabb> {
        self.boundary
    }

    /// Keys of the items in every leaf the query box reaches, each listed
    /// once. Items near the query may be included; items overlapping it
    /// never are missed.
    pub fn get_objects(&self, query: &Aabb) -> Vec<K> {
        match &self.boundary {
            Some(boundary) if boundary.intersects(query) => {}
            _ => return Vec::new(),
        }
        let mut indices = Vec::new();
        self.root.collect(query, &mut indices);
        indices.sort_unstable();
        indices.dedup();
        indices.into_iter().map(|i| self.items[i].key).collect()
    }
}
