//! 名称规则
//!
//! 域名、镜像名与版本号共用同一字符集：`[a-z0-9_-]`。
//! 边界层负责小写化，存储层负责拒绝（而非修正）非法名称

/// 检查名称是否只包含允许的字符且非空
pub fn is_valid(name: &str) -> bool {
    !name.is_empty()
        && name
            .bytes()
            .all(|b| matches!(b, b'a'..=b'z' | b'0'..=b'9' | b'_' | b'-'))
}

/// 规范化外部输入：去除首尾空白并转为小写
///
/// 不做任何字符替换，非法字符留给 [`is_valid`] 拒绝
pub fn normalize(raw: &str) -> String {
    raw.trim().to_ascii_lowercase()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_valid_names() {
        assert!(is_valid("shop"));
        assert!(is_valid("api-gw"));
        assert!(is_valid("worker_2"));
        assert!(is_valid("2025-01-01-10-15-30"));
    }

    #[test]
    fn test_invalid_names() {
        assert!(!is_valid(""));
        assert!(!is_valid("Shop"));
        assert!(!is_valid("api gw"));
        assert!(!is_valid("api.gw"));
        assert!(!is_valid("web/app"));
        assert!(!is_valid("caf\u{e9}"));
    }

    #[test]
    fn test_normalize_lowercases_without_correcting() {
        assert_eq!(normalize("  Shop "), "shop");
        assert_eq!(normalize("API-GW"), "api-gw");
        // 非法字符保留，由 is_valid 拒绝
        assert_eq!(normalize("Api.Gw"), "api.gw");
        assert!(!is_valid(&normalize("Api.Gw")));
    }
}
