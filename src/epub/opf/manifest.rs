//! 清单模块
//!
//! 提供EPUB包中文件清单的结构定义。

use serde::{Deserialize, Serialize};

/// 清单(文件列表)，保持文档顺序
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Manifest {
    pub items: Vec<Item>,
}

impl Manifest {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, item: Item) {
        self.items.push(item);
    }

    /// 根据ID获取清单项
    pub fn item(&self, id: &str) -> Option<&Item> {
        self.items.iter().find(|item| item.id == id)
    }

    /// 导航文档
    pub fn nav(&self) -> Option<&Item> {
        self.items.iter().find(|item| item.is_nav())
    }

    /// 封面图片
    pub fn cover_image(&self) -> Option<&Item> {
        self.items.iter().find(|item| item.is_cover_image())
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

/// 清单项信息
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Item {
    /// 项目ID
    pub id: String,
    /// 文件路径(相对于OPF文件)
    pub href: String,
    /// 媒体类型
    pub media_type: String,
    /// 属性(如nav、cover-image等)
    #[serde(default)]
    pub properties: Vec<String>,
    /// 后备清单项ID
    pub fallback: Option<String>,
}

impl Item {
    /// 创建新的清单项
    pub fn new(id: impl Into<String>, href: impl Into<String>, media_type: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            href: href.into(),
            media_type: media_type.into(),
            ..Self::default()
        }
    }

    /// 检查是否包含指定属性
    pub fn has_property(&self, property: &str) -> bool {
        self.properties.iter().any(|p| p == property)
    }

    /// 检查是否为导航文档
    pub fn is_nav(&self) -> bool {
        self.has_property("nav")
    }

    /// 检查是否为封面图片
    pub fn is_cover_image(&self) -> bool {
        self.has_property("cover-image")
    }

    /// 检查是否为XHTML文件
    pub fn is_xhtml(&self) -> bool {
        self.media_type == "application/xhtml+xml"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lookup_by_id_and_property() {
        let mut manifest = Manifest::new();
        manifest.push(Item::new("nav", "nav.xhtml", "application/xhtml+xml"));
        manifest.push(Item::new("cover", "images/cover.jpg", "image/jpeg"));
        manifest.items[0].properties.push("nav".to_string());
        manifest.items[1].properties.push("cover-image".to_string());

        assert_eq!(manifest.len(), 2);
        assert_eq!(manifest.item("cover").map(|item| item.href.as_str()), Some("images/cover.jpg"));
        assert!(manifest.item("missing").is_none());
        assert_eq!(manifest.nav().map(|item| item.id.as_str()), Some("nav"));
        assert!(manifest.nav().is_some_and(Item::is_xhtml));
        assert_eq!(manifest.cover_image().map(|item| item.id.as_str()), Some("cover"));
    }
}
