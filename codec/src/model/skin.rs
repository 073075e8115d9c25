//! Skins (`GLTFSkin`) and skeletons (`GLTFSkeleton`)

/// Binding of mesh vertices to a set of joint nodes
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Skin {
    pub name: Option<String>,
    /// Joint node indices, in the order vertex JOINTS_n refer to them
    pub joints: Vec<usize>,
    /// MAT4 accessor with one inverse bind matrix per joint
    pub inverse_bind_matrices: Option<usize>,
    /// Declared common root of the joint hierarchy
    pub skeleton_root: Option<usize>,
    /// Skeleton the joints were grouped into
    pub skeleton: Option<usize>,
}

/// A connected group of joint nodes shared by one or more skins
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Skeleton {
    pub name: Option<String>,
    /// Joint node indices, sorted
    pub joints: Vec<usize>,
    /// Joints whose parent is not part of this skeleton
    pub roots: Vec<usize>,
    /// Skins bound to this skeleton
    pub skins: Vec<usize>,
}

impl Skeleton {
    pub fn contains(&self, node: usize) -> bool {
        self.joints.binary_search(&node).is_ok()
    }
}
