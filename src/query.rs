pub const PAGE_SIZE: i64 = 10;

/// 1-based page number taken from the `page` query parameter. Anything that
/// is not a positive integer acts as page 1.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Page(i64);

impl Page {
    pub fn parse(raw: Option<&str>) -> Self {
        let number = raw
            .and_then(|value| value.trim().parse::<i64>().ok())
            .filter(|value| *value >= 1)
            .unwrap_or(1);
        Page(number)
    }

    pub fn number(self) -> i64 {
        self.0
    }

    pub fn offset(self) -> i64 {
        (self.0 - 1) * PAGE_SIZE
    }
}

/// Accumulates WHERE clauses together with their bound parameters so the
/// count query and the page query are always built from the same predicate
/// list. Clause text uses `?` placeholders and parameters bind in insertion
/// order, all as text; SQLite's column affinity covers the numeric columns.
#[derive(Debug, Clone, Default)]
pub struct Filters {
    clauses: Vec<String>,
    params: Vec<String>,
}

impl Filters {
    pub fn new() -> Self {
        Filters::default()
    }

    /// A literal clause with no placeholder.
    pub fn add(&mut self, clause: impl Into<String>) {
        self.clauses.push(clause.into());
    }

    pub fn add_text(&mut self, clause: impl Into<String>, value: impl Into<String>) {
        self.clauses.push(clause.into());
        self.params.push(value.into());
    }

    /// One clause binding several placeholders, e.g. a grouped OR.
    pub fn add_texts(&mut self, clause: impl Into<String>, values: Vec<String>) {
        self.clauses.push(clause.into());
        self.params.extend(values);
    }

    pub fn where_sql(&self) -> String {
        if self.clauses.is_empty() {
            String::new()
        } else {
            format!(" WHERE {}", self.clauses.join(" AND "))
        }
    }

    /// `SELECT COUNT(*) FROM {from}` plus the shared WHERE clause.
    pub fn count_sql(&self, from: &str) -> String {
        format!("SELECT COUNT(*) FROM {from}{}", self.where_sql())
    }

    /// Appends the shared WHERE clause, ordering and `LIMIT ? OFFSET ?` to a
    /// `SELECT … FROM …` prefix.
    pub fn select_sql(&self, select: &str, order_by: &str) -> String {
        format!(
            "{select}{} ORDER BY {order_by} LIMIT ? OFFSET ?",
            self.where_sql()
        )
    }

    pub fn params(&self) -> &[String] {
        &self.params
    }
}

pub fn like_pattern(needle: &str) -> String {
    format!("%{}%", needle.trim())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn page_parse_clamps_and_defaults() {
        assert_eq!(Page::parse(None).number(), 1);
        assert_eq!(Page::parse(Some("3")).number(), 3);
        assert_eq!(Page::parse(Some(" 2 ")).number(), 2);
        assert_eq!(Page::parse(Some("0")).number(), 1);
        assert_eq!(Page::parse(Some("-4")).number(), 1);
        assert_eq!(Page::parse(Some("abc")).number(), 1);
        assert_eq!(Page::parse(Some("")).number(), 1);
    }

    #[test]
    fn page_offset_is_zero_based() {
        assert_eq!(Page::parse(Some("1")).offset(), 0);
        assert_eq!(Page::parse(Some("4")).offset(), 30);
    }

    #[test]
    fn empty_filters_render_no_where() {
        let filters = Filters::new();
        assert_eq!(filters.count_sql("users"), "SELECT COUNT(*) FROM users");
        assert_eq!(
            filters.select_sql("SELECT * FROM users", "created_at DESC"),
            "SELECT * FROM users ORDER BY created_at DESC LIMIT ? OFFSET ?"
        );
    }

    #[test]
    fn count_and_select_share_the_where_clause() {
        let mut filters = Filters::new();
        filters.add_texts(
            "(full_name LIKE ? OR email LIKE ?)",
            vec!["%ann%".into(), "%ann%".into()],
        );
        filters.add_text("role = ?", "staff");
        filters.add("is_active = 1");

        let where_sql = filters.where_sql();
        assert_eq!(
            where_sql,
            " WHERE (full_name LIKE ? OR email LIKE ?) AND role = ? AND is_active = 1"
        );
        assert!(filters.count_sql("users").ends_with(&where_sql));
        assert!(filters
            .select_sql("SELECT id FROM users", "full_name")
            .contains(&where_sql));
        assert_eq!(filters.params().len(), 3);
    }

    #[test]
    fn like_pattern_wraps_and_trims() {
        assert_eq!(like_pattern(" ann "), "%ann%");
    }
}
