//! Identity on whose behalf the SDK acts

/// The signed-in member, or nobody
///
/// Authentication itself happens elsewhere; the SDK only needs to know
/// whether there is a member and which one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Viewer {
    #[default]
    Anonymous,
    Member(i64),
}

impl Viewer {
    pub fn member_id(&self) -> Option<i64> {
        match self {
            Viewer::Anonymous => None,
            Viewer::Member(id) => Some(*id),
        }
    }

    pub fn is_signed_in(&self) -> bool {
        matches!(self, Viewer::Member(_))
    }
}

impl From<Option<i64>> for Viewer {
    fn from(member_id: Option<i64>) -> Self {
        member_id.map_or(Viewer::Anonymous, Viewer::Member)
    }
}
