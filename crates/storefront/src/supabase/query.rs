//! `PostgREST` query parameters.
//!
//! Filters are built as `(name, value)` pairs and URL-encoded by `reqwest`.

use online_store_core::{CartLineId, ProductFilter, UserId};

pub type Params = Vec<(&'static str, String)>;

/// Parameters for listing products under a filter.
pub fn products(filter: &ProductFilter) -> Params {
    let mut params = vec![("select", "*".to_string())];

    if let Some(search) = &filter.search {
        let pattern = quote(&format!("*{}*", like_escape(search)));
        params.push((
            "or",
            format!("(name.ilike.{pattern},description.ilike.{pattern})"),
        ));
    }

    if let Some(category) = &filter.category {
        params.push(("category", format!("eq.{category}")));
    }

    params.push((
        "order",
        format!("{}.{},id.asc", filter.sort.column(), filter.direction.as_str()),
    ));
    params
}

/// Every non-null category, one row per product.
pub fn categories() -> Params {
    vec![
        ("select", "category".to_string()),
        ("category", "not.is.null".to_string()),
        ("order", "created_at.asc,id.asc".to_string()),
    ]
}

/// A user's cart lines with their products embedded.
pub fn cart(user: UserId) -> Params {
    vec![
        ("select", "*,product:products(*)".to_string()),
        ("user_id", eq(user)),
        ("order", "created_at.asc,id.asc".to_string()),
    ]
}

/// Only the quantities of a user's lines.
pub fn cart_quantities(user: UserId) -> Params {
    vec![("select", "quantity".to_string()), ("user_id", eq(user))]
}

/// One line, scoped to its owner.
pub fn cart_line(user: UserId, line: CartLineId) -> Params {
    vec![("id", eq(line)), ("user_id", eq(user))]
}

/// Every line of one user.
pub fn cart_owner(user: UserId) -> Params {
    vec![("user_id", eq(user))]
}

/// Upsert target: one line per (user, product).
pub fn cart_upsert() -> Params {
    vec![("on_conflict", "user_id,product_id".to_string())]
}

fn eq(value: impl std::fmt::Display) -> String {
    format!("eq.{value}")
}

/// Make `LIKE` metacharacters literal.
///
/// `PostgREST` rewrites every `*` to `%` before the pattern reaches Postgres,
/// so a literal `*` cannot be expressed; it becomes the single-character
/// wildcard and the store narrows the rows afterwards.
fn like_escape(value: &str) -> String {
    let mut escaped = String::with_capacity(value.len());
    for c in value.chars() {
        match c {
            '\\' | '%' | '_' => {
                escaped.push('\\');
                escaped.push(c);
            }
            '*' => escaped.push('_'),
            c => escaped.push(c),
        }
    }
    escaped
}

/// Double-quote a value inside a logic tree so `,.()` are taken literally.
fn quote(value: &str) -> String {
    let escaped = value.replace('\\', "\\\\").replace('"', "\\\"");
    format!("\"{escaped}\"")
}

#[cfg(test)]
mod tests {
    use online_store_core::SortOption;

    use super::*;

    fn value<'a>(params: &'a Params, name: &str) -> Option<&'a str> {
        params
            .iter()
            .find(|(key, _)| *key == name)
            .map(|(_, value)| value.as_str())
    }

    #[test]
    fn test_default_filter_only_orders() {
        let params = products(&ProductFilter::default());
        assert_eq!(value(&params, "order"), Some("created_at.desc,id.asc"));
        assert_eq!(value(&params, "or"), None);
        assert_eq!(value(&params, "category"), None);
    }

    #[test]
    fn test_search_category_and_sort() {
        let filter = ProductFilter::new(
            Some("mug"),
            Some("Kitchen"),
            "price-asc".parse::<SortOption>().unwrap_or_default(),
        );
        let params = products(&filter);

        assert_eq!(
            value(&params, "or"),
            Some(r#"(name.ilike."*mug*",description.ilike."*mug*")"#)
        );
        assert_eq!(value(&params, "category"), Some("eq.Kitchen"));
        assert_eq!(value(&params, "order"), Some("price.asc,id.asc"));
    }

    #[test]
    fn test_search_reserved_characters_are_quoted() {
        let filter = ProductFilter::new(Some(r#"a,b"(c)\"#), None, SortOption::default());
        let params = products(&filter);
        assert_eq!(
            value(&params, "or"),
            Some(r#"(name.ilike."*a,b\"(c)\\\\*",description.ilike."*a,b\"(c)\\\\*")"#)
        );
    }

    fn name_pattern(search: &str) -> String {
        let filter = ProductFilter::new(Some(search), None, SortOption::default());
        let params = products(&filter);
        let or = value(&params, "or").unwrap_or_default();
        or.trim_start_matches("(name.ilike.")
            .split(",description.ilike.")
            .next()
            .unwrap_or_default()
            .to_string()
    }

    #[test]
    fn test_search_like_metacharacters_are_literal() {
        assert_eq!(name_pattern("_"), r#""*\\_*""#);
        assert_eq!(name_pattern("50%"), r#""*50\\%*""#);
        assert_eq!(name_pattern("C:\\"), r#""*C:\\\\*""#);
        assert_eq!(name_pattern("a*b"), r#""*a_b*""#);
    }

    #[test]
    fn test_cart_line_scoped_to_owner() {
        let user = UserId::generate();
        let line = CartLineId::generate();
        let params = cart_line(user, line);
        assert_eq!(value(&params, "id"), Some(format!("eq.{line}").as_str()));
        assert_eq!(value(&params, "user_id"), Some(format!("eq.{user}").as_str()));
    }
}
