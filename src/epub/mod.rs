pub mod error;
pub mod opf;

// 重新导出错误处理
pub use error::{EpubError, Result};

// 重新导出OPF相关
pub use opf::{
    DcCollection,
    DcElement,
    Dcmes,
    Identifier,
    Item,
    Itemref,
    ItemrefRendition,
    ItemrefRenditionMut,
    Link,
    Manifest,
    Meta,
    Metadata,
    MetadataTagConfig,
    MetadataTagConfigs,
    Package,
    PrefixHost,
    Refinable,
    RefinementTerm,
    Rendition,
    RenditionMut,
    RenditionProperty,
    Spine,
    Title,
    TitleType,
};
