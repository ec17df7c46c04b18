pub const MAX_CONTENT_CHARS: usize = 5000;

// trim user supplied text and check that it's neither empty nor too long
pub fn clean_content(content: &str) -> Result<String, &'static str> {
    let content = content.trim();

    if content.is_empty() {
        return Err("No content provided");
    }

    if content.chars().count() > MAX_CONTENT_CHARS {
        return Err("Content too long (max 5000 characters)");
    }

    Ok(content.to_string())
}

#[derive(serde::Deserialize, Debug, Clone, Copy)]
pub struct Pagination {
    #[serde(default = "default_limit")]
    pub limit: i64,
    #[serde(default)]
    pub offset: i64,
}

fn default_limit() -> i64 {
    10
}

impl Pagination {
    const MAX_LIMIT: i64 = 100;

    // negative or huge values are clamped instead of rejected
    pub fn clamped(self) -> Self {
        Pagination {
            limit: self.limit.clamp(0, Self::MAX_LIMIT),
            offset: self.offset.max(0),
        }
    }
}
