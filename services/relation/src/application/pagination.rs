//! 分页参数处理

const DEFAULT_LIMIT: i32 = 20;

/// 应用分页默认值并计算偏移量
///
/// limit <= 0 取 20，page <= 0 取 1；返回 (limit, offset)
pub fn set_pagination_defaults(limit: i32, page: i32) -> (i32, i32) {
    let limit = if limit <= 0 { DEFAULT_LIMIT } else { limit };
    let page = if page <= 0 { 1 } else { page };
    let offset = (page - 1) * limit;
    (limit, offset)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_applied() {
        assert_eq!(set_pagination_defaults(0, 0), (20, 0));
        assert_eq!(set_pagination_defaults(-5, -1), (20, 0));
    }

    #[test]
    fn test_offset_computed_from_page() {
        assert_eq!(set_pagination_defaults(10, 1), (10, 0));
        assert_eq!(set_pagination_defaults(10, 3), (10, 20));
        assert_eq!(set_pagination_defaults(25, 2), (25, 25));
    }
}
