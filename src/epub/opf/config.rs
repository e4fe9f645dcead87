//! 元数据标签配置模块
//!
//! 定义解析 `<metadata>` 时 XML 元素名到 Dublin Core 集合的映射，支持从YAML加载配置。

use crate::epub::error::{EpubError, Result};
use crate::epub::opf::metadata::DcElement;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

/// 单个集合的标签配置
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetadataTagConfig {
    /// 标签列表（不含命名空间前缀的本地名）
    pub tags: Vec<String>,
    /// 可选的描述
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

impl MetadataTagConfig {
    /// 创建新的标签配置
    pub fn new(tags: Vec<String>) -> Self {
        Self {
            tags,
            description: None,
        }
    }

    /// 创建带描述的标签配置
    pub fn with_description(tags: &[&str], description: &str) -> Self {
        Self {
            tags: tags.iter().map(|tag| tag.to_string()).collect(),
            description: Some(description.to_string()),
        }
    }

    fn matches(&self, local_name: &str) -> bool {
        self.tags.iter().any(|tag| tag == local_name)
    }
}

/// 元数据标签配置，定义每个 Dublin Core 集合对应的可能标签
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetadataTagConfigs {
    pub identifier: MetadataTagConfig,
    pub title: MetadataTagConfig,
    pub language: MetadataTagConfig,
    pub contributor: MetadataTagConfig,
    pub coverage: MetadataTagConfig,
    pub creator: MetadataTagConfig,
    pub date: MetadataTagConfig,
    pub description: MetadataTagConfig,
    pub format: MetadataTagConfig,
    pub publisher: MetadataTagConfig,
    pub relation: MetadataTagConfig,
    pub rights: MetadataTagConfig,
    pub source: MetadataTagConfig,
    pub subject: MetadataTagConfig,
    #[serde(rename = "type")]
    pub dc_type: MetadataTagConfig,
}

impl Default for MetadataTagConfigs {
    fn default() -> Self {
        Self::default_config()
    }
}

impl MetadataTagConfigs {
    /// 从YAML文本加载配置
    pub fn from_yaml_str(content: &str) -> Result<Self> {
        serde_yml::from_str(content)
            .map_err(|e| EpubError::ConfigError(format!("配置文件格式错误: {}", e)))
    }

    /// 从YAML文件加载配置
    ///
    /// # 示例
    ///
    /// ```rust,no_run
    /// use bookforge_opf::MetadataTagConfigs;
    /// let config = MetadataTagConfigs::from_path("metadata.yaml")?;
    /// # Ok::<(), Box<dyn std::error::Error>>(())
    /// ```
    pub fn from_path<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = fs::read_to_string(path.as_ref())
            .map_err(|e| EpubError::ConfigError(format!("无法读取配置文件: {}", e)))?;
        Self::from_yaml_str(&content)
    }

    /// 序列化为YAML文本，带注释头
    pub fn to_yaml_string(&self) -> Result<String> {
        let yaml_content = serde_yml::to_string(self)
            .map_err(|e| EpubError::ConfigError(format!("序列化配置失败: {}", e)))?;
        Ok(format!(
            "# 元数据标签配置文件\n# 定义 <metadata> 中元素名到 Dublin Core 集合的映射\n\n{}",
            yaml_content
        ))
    }

    /// 获取默认配置
    pub fn default_config() -> Self {
        Self {
            identifier: MetadataTagConfig::with_description(&["identifier"], "书籍标识符（ISBN、UUID等）"),
            title: MetadataTagConfig::with_description(&["title"], "书籍标题"),
            language: MetadataTagConfig::with_description(&["language"], "书籍语言"),
            contributor: MetadataTagConfig::with_description(&["contributor"], "贡献者信息（编辑、插图等）"),
            coverage: MetadataTagConfig::with_description(&["coverage"], "时空范围"),
            creator: MetadataTagConfig::with_description(&["creator"], "作者/创建者信息"),
            date: MetadataTagConfig::with_description(&["date"], "出版日期"),
            description: MetadataTagConfig::with_description(&["description"], "书籍描述/简介"),
            format: MetadataTagConfig::with_description(&["format"], "媒体格式"),
            publisher: MetadataTagConfig::with_description(&["publisher"], "出版社信息"),
            relation: MetadataTagConfig::with_description(&["relation"], "相关资源"),
            rights: MetadataTagConfig::with_description(&["rights"], "版权信息"),
            source: MetadataTagConfig::with_description(&["source"], "来源"),
            subject: MetadataTagConfig::with_description(&["subject"], "书籍主题/分类"),
            dc_type: MetadataTagConfig::with_description(&["type"], "书籍类型"),
        }
    }

    /// 指定集合的标签配置
    pub fn get(&self, element: DcElement) -> &MetadataTagConfig {
        match element {
            DcElement::Identifiers => &self.identifier,
            DcElement::Titles => &self.title,
            DcElement::Languages => &self.language,
            DcElement::Contributors => &self.contributor,
            DcElement::Coverages => &self.coverage,
            DcElement::Creators => &self.creator,
            DcElement::Dates => &self.date,
            DcElement::Descriptions => &self.description,
            DcElement::Formats => &self.format,
            DcElement::Publishers => &self.publisher,
            DcElement::Relations => &self.relation,
            DcElement::Rights => &self.rights,
            DcElement::Sources => &self.source,
            DcElement::Subjects => &self.subject,
            DcElement::Types => &self.dc_type,
        }
    }

    /// 元素本地名对应的集合，多个集合配置了同一标签时取 [`DcElement::ALL`] 中靠前的
    pub fn collection_for(&self, local_name: &str) -> Option<DcElement> {
        DcElement::ALL
            .iter()
            .copied()
            .find(|&element| self.get(element).matches(local_name))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_default_mapping() {
        let config = MetadataTagConfigs::default();
        assert_eq!(config.collection_for("title"), Some(DcElement::Titles));
        assert_eq!(config.collection_for("type"), Some(DcElement::Types));
        assert_eq!(config.collection_for("meta"), None);
    }

    #[test]
    fn test_yaml_round_trip_keeps_custom_tags() {
        let mut config = MetadataTagConfigs::default_config();
        config.creator.tags.push("author".to_string());

        let yaml = config.to_yaml_string().unwrap();
        assert!(yaml.starts_with("# 元数据标签配置文件"));
        let loaded = MetadataTagConfigs::from_yaml_str(&yaml).unwrap();
        assert_eq!(loaded, config);
        assert_eq!(loaded.collection_for("author"), Some(DcElement::Creators));
    }

    #[test]
    fn test_from_path() {
        let mut config = MetadataTagConfigs::default_config();
        config.subject.tags = vec!["subject".to_string(), "keyword".to_string()];

        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(config.to_yaml_string().unwrap().as_bytes()).unwrap();

        let loaded = MetadataTagConfigs::from_path(file.path()).unwrap();
        assert_eq!(loaded.collection_for("keyword"), Some(DcElement::Subjects));
    }

    #[test]
    fn test_invalid_yaml_is_config_error() {
        let err = MetadataTagConfigs::from_yaml_str("title: [unclosed").unwrap_err();
        assert!(matches!(err, EpubError::ConfigError(_)));

        let err = MetadataTagConfigs::from_path("/nonexistent/metadata.yaml").unwrap_err();
        assert!(matches!(err, EpubError::ConfigError(_)));
    }
}
