//! Skeleton determination
//!
//! glTF only stores skins as flat joint lists. Engines want skeletons:
//! connected joint hierarchies that may be shared by several skins. Each
//! skin's joints are expanded with the nodes that connect them, then skins
//! that share joints, or whose joints are parent and child, are merged.

use hashbrown::HashSet;

use crate::error::Result;
use crate::model::{Document, Skeleton};

struct DisjointSet {
    parent: Vec<usize>,
}

impl DisjointSet {
    fn new(count: usize) -> Self {
        Self {
            parent: (0..count).collect(),
        }
    }

    fn find(&mut self, mut x: usize) -> usize {
        while self.parent[x] != x {
            self.parent[x] = self.parent[self.parent[x]];
            x = self.parent[x];
        }
        x
    }

    fn union(&mut self, a: usize, b: usize) {
        let (a, b) = (self.find(a), self.find(b));
        if a != b {
            // Keep the smaller index as representative so grouping is stable
            let (low, high) = if a < b { (a, b) } else { (b, a) };
            self.parent[high] = low;
        }
    }
}

/// Ancestors of `node`, starting with the node itself
fn ancestry(document: &Document, node: usize) -> Vec<usize> {
    let mut chain = vec![node];
    let mut current = document.nodes[node].parent;
    while let Some(parent) = current {
        chain.push(parent);
        current = document.nodes[parent].parent;
    }
    chain
}

/// Close a joint set over the nodes connecting its members
pub fn expand_joints(document: &Document, joints: &[usize]) -> Vec<usize> {
    let mut set: HashSet<usize> = joints.iter().copied().collect();

    // Fill gaps between a joint and a joint ancestor
    for &joint in joints {
        let chain = ancestry(document, joint);
        if let Some(hit) = chain.iter().skip(1).position(|n| set.contains(n)) {
            set.extend(chain[1..=hit].iter().copied());
        }
    }

    // Join separate roots at their lowest common ancestor
    let roots: Vec<usize> = set
        .iter()
        .copied()
        .filter(|&n| document.nodes[n].parent.is_none_or(|p| !set.contains(&p)))
        .collect();
    if roots.len() > 1 {
        let chains: Vec<Vec<usize>> = roots.iter().map(|&r| ancestry(document, r)).collect();
        let common = chains[0]
            .iter()
            .copied()
            .find(|candidate| chains[1..].iter().all(|c| c.contains(candidate)));
        if let Some(common) = common {
            for chain in &chains {
                for &node in chain {
                    set.insert(node);
                    if node == common {
                        break;
                    }
                }
            }
        }
    }

    let mut expanded: Vec<usize> = set.into_iter().collect();
    expanded.sort_unstable();
    expanded
}

/// Group skin joints into skeletons and mark joint nodes
///
/// Expects a validated document (acyclic parents, in-range joints).
pub fn determine_skeletons(document: &mut Document) -> Result<()> {
    let count = document.nodes.len();
    let mut sets = DisjointSet::new(count);
    let mut is_joint = vec![false; count];

    for skin in &document.skins {
        let expanded = expand_joints(document, &skin.joints);
        for &joint in &expanded {
            is_joint[joint] = true;
            sets.union(expanded[0], joint);
        }
    }

    for node in 0..count {
        if let Some(parent) = document.nodes[node].parent {
            if is_joint[node] && is_joint[parent] {
                sets.union(node, parent);
            }
        }
    }

    // Representatives are the smallest joint of each group, so index order is stable
    let mut skeleton_of = vec![None; count];
    let mut skeletons: Vec<Skeleton> = Vec::new();
    for node in 0..count {
        if !is_joint[node] {
            continue;
        }
        let representative = sets.find(node);
        let skeleton = match skeleton_of[representative] {
            Some(existing) => existing,
            None => {
                skeletons.push(Skeleton::default());
                let created = skeletons.len() - 1;
                skeleton_of[representative] = Some(created);
                created
            }
        };
        skeleton_of[node] = Some(skeleton);
        skeletons[skeleton].joints.push(node);
    }

    for (index, skeleton) in skeletons.iter_mut().enumerate() {
        skeleton.roots = skeleton
            .joints
            .iter()
            .copied()
            .filter(|&joint| {
                document.nodes[joint]
                    .parent
                    .is_none_or(|parent| skeleton_of[parent] != Some(index))
            })
            .collect();
    }

    for (skin_index, skin) in document.skins.iter_mut().enumerate() {
        skin.skeleton = skin.joints.first().and_then(|&joint| skeleton_of[joint]);
        if let Some(skeleton) = skin.skeleton {
            skeletons[skeleton].skins.push(skin_index);
        }
    }

    for (node, skeleton) in document.nodes.iter_mut().zip(&skeleton_of) {
        node.joint = skeleton.is_some();
        node.skeleton = *skeleton;
    }

    tracing::debug!(
        "Determined {} skeleton(s) from {} skin(s)",
        skeletons.len(),
        document.skins.len()
    );
    document.skeletons = skeletons;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Node, Skin};

    /// root(0) -> hips(1) -> spine(2) -> head(3), hips(1) -> leg(4); prop(5) separate
    fn rig() -> Document {
        let mut document = Document::new();
        let names = ["root", "hips", "spine", "head", "leg", "prop"];
        document.nodes = names.iter().map(|n| Node::named(n)).collect();
        document.nodes[0].children = vec![1];
        document.nodes[1].children = vec![2, 4];
        document.nodes[2].children = vec![3];
        document.root_nodes = vec![0, 5];
        document.link_parents().unwrap();
        document
    }

    fn skin(joints: &[usize]) -> Skin {
        Skin {
            joints: joints.to_vec(),
            ..Default::default()
        }
    }

    #[test]
    fn test_gap_between_joints_is_filled() {
        let document = rig();
        assert_eq!(expand_joints(&document, &[1, 3]), vec![1, 2, 3]);
    }

    #[test]
    fn test_sibling_roots_join_at_common_ancestor() {
        let document = rig();
        assert_eq!(expand_joints(&document, &[3, 4]), vec![1, 2, 3, 4]);
    }

    #[test]
    fn test_overlapping_skins_share_skeleton() {
        let mut document = rig();
        document.skins = vec![skin(&[1, 2]), skin(&[2, 3]), skin(&[5])];
        determine_skeletons(&mut document).unwrap();

        assert_eq!(document.skeletons.len(), 2);
        assert_eq!(document.skeletons[0].joints, vec![1, 2, 3]);
        assert_eq!(document.skeletons[0].roots, vec![1]);
        assert_eq!(document.skeletons[0].skins, vec![0, 1]);
        assert_eq!(document.skeletons[1].joints, vec![5]);
        assert_eq!(document.skins[2].skeleton, Some(1));

        assert!(document.nodes[2].joint);
        assert!(!document.nodes[0].joint);
        assert_eq!(document.nodes[3].skeleton, Some(0));
        document.validate().unwrap();
    }

    #[test]
    fn test_parent_child_skins_merge() {
        let mut document = rig();
        document.skins = vec![skin(&[1]), skin(&[2])];
        determine_skeletons(&mut document).unwrap();
        assert_eq!(document.skeletons.len(), 1);
        assert_eq!(document.skeletons[0].joints, vec![1, 2]);
    }
}
