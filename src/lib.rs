pub mod epub;

// === 核心API重新导出 ===

/// 包文档
pub use epub::{Package, PrefixHost};

/// 错误处理
pub use epub::{EpubError, Result};

// === 元数据 ===

pub use epub::{
    DcCollection,
    DcElement,
    Dcmes,
    Identifier,
    Link,
    Meta,
    Metadata,
    Title,
    TitleType,
};

/// 精化关系
pub use epub::{Refinable, RefinementTerm};

/// rendition 属性
pub use epub::{ItemrefRendition, ItemrefRenditionMut, Rendition, RenditionMut, RenditionProperty};

// === 清单与脊柱 ===

pub use epub::{Item, Itemref, Manifest, Spine};

/// 解析配置
pub use epub::{MetadataTagConfig, MetadataTagConfigs};

// === 库信息 ===

/// 库的版本信息
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// 库的描述
pub const DESCRIPTION: &str = "EPUB OPF 包文档元数据模型与 rendition 属性库";

// === 便捷函数 ===

/// 解析OPF包文档
///
/// 这是 `Package::parse_xml` 的便捷包装函数。
///
/// # 示例
///
/// ```rust
/// use bookforge_opf::{PrefixHost, Rendition};
///
/// let opf = r#"<package version="3.0" prefix="rendition: http://www.idpf.org/vocab/rendition/#">
///   <metadata><meta property="rendition:layout">pre-paginated</meta></metadata>
///   <spine><itemref idref="p1"/></spine>
/// </package>"#;
/// let package = bookforge_opf::parse(opf)?;
/// assert!(package.using_fixed_layout());
/// assert!(package.itemref_rendition(0)?.is_pre_paginated());
/// # Ok::<(), bookforge_opf::EpubError>(())
/// ```
pub fn parse(xml_content: &str) -> Result<Package> {
    Package::parse_xml(xml_content)
}
