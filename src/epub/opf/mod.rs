//! OPF（Open Packaging Format）包文档模块
//!
//! 此模块提供EPUB包文档的内存对象模型：元数据、精化关系、清单、脊柱，
//! 以及在包级meta与itemref属性两处存放的 rendition 属性。

mod config;
mod manifest;
mod metadata;
mod package;
mod parser;
mod refinement;
mod rendition;
mod spine;

// 重新导出公共类型
pub use config::{MetadataTagConfig, MetadataTagConfigs};
pub use manifest::{Item, Manifest};
pub use metadata::{
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
pub use package::{Package, PrefixHost};
pub use refinement::{Refinable, RefinementTerm};
pub use rendition::{
    ItemrefRendition,
    ItemrefRenditionMut,
    Rendition,
    RenditionMut,
    RenditionProperty,
    PREFIX_KEY,
    PREFIX_VALUE,
};
pub use spine::{Itemref, Spine};
