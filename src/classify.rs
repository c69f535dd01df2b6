use crate::model::QueryType;

/// Privilege prefixes, most specific first. The first prefix the privilege
/// starts with wins, so `indices:admin/delete` must precede `indices:admin/`.
pub const PRIVILEGE_RULES: &[(&str, QueryType)] = &[
    ("cluster:admin/", QueryType::Admin),
    ("cluster:monitor/", QueryType::Monitor),
    ("indices:admin/delete", QueryType::Destroy),
    ("indices:admin/", QueryType::Admin),
    ("indices:data/read/", QueryType::Read),
    ("indices:data/write/delete", QueryType::Delete),
    ("indices:data/write/", QueryType::Write),
    ("indices:monitor/", QueryType::Monitor),
];

/// REST endpoint actions, matched exactly.
pub const ACTION_RULES: &[(&str, QueryType)] = &[
    ("_msearch", QueryType::Msearch),
    ("_bulk", QueryType::Bulk),
    ("_doc", QueryType::Write),
    ("_create", QueryType::Write),
    ("_search", QueryType::Search),
];

pub fn classify_privilege(privilege: &str) -> QueryType {
    PRIVILEGE_RULES
        .iter()
        .find(|(prefix, _)| privilege.starts_with(prefix))
        .map_or(QueryType::Unknown, |(_, query_type)| *query_type)
}

pub fn classify_action(action: &str) -> QueryType {
    ACTION_RULES
        .iter()
        .find(|(name, _)| *name == action)
        .map_or(QueryType::Other, |(_, query_type)| *query_type)
}
