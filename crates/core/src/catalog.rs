use crate::domain::request_type::RequestType;
use crate::domain::user::User;

/// Request types sharing a category, in server response order.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CategoryGroup {
    pub category: String,
    pub types: Vec<RequestType>,
}

/// Read-mostly mirror of the reference data every screen needs: the user
/// directory and the request-type catalog.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Catalog {
    pub users: Vec<User>,
    pub types: Vec<RequestType>,
}

impl Catalog {
    pub fn new(users: Vec<User>, types: Vec<RequestType>) -> Self {
        Self { users, types }
    }

    /// Users who may be assigned as approvers. Role canonicalization already
    /// folded both historical spellings into one variant, so this is a plain
    /// enum match.
    pub fn approvers(&self) -> Vec<&User> {
        self.users.iter().filter(|user| user.role.is_approver()).collect()
    }

    pub fn user(&self, id: crate::domain::user::UserId) -> Option<&User> {
        self.users.iter().find(|user| user.id == id)
    }

    /// Types grouped by category, categories and members both in first-seen
    /// server response order.
    pub fn grouped_types(&self) -> Vec<CategoryGroup> {
        group_by_category(&self.types)
    }

    /// Types offered for new requests. Deactivated types are excluded here
    /// but stay resolvable through [`Catalog::type_by_key`] for existing
    /// requests.
    pub fn active_types(&self) -> Vec<&RequestType> {
        self.types.iter().filter(|request_type| request_type.active).collect()
    }

    pub fn type_by_key(&self, key: &str) -> Option<&RequestType> {
        self.types.iter().find(|request_type| request_type.key.eq_ignore_ascii_case(key))
    }

    /// Display label for a type key, falling back to the raw key when the
    /// catalog no longer knows it.
    pub fn label_for(&self, key: &str) -> String {
        self.type_by_key(key)
            .map_or_else(|| key.to_owned(), |request_type| request_type.label.clone())
    }
}

pub fn group_by_category(types: &[RequestType]) -> Vec<CategoryGroup> {
    let mut groups: Vec<CategoryGroup> = Vec::new();
    for request_type in types {
        match groups.iter_mut().find(|group| group.category == request_type.category) {
            Some(group) => group.types.push(request_type.clone()),
            None => groups.push(CategoryGroup {
                category: request_type.category.clone(),
                types: vec![request_type.clone()],
            }),
        }
    }
    groups
}
