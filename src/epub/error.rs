use thiserror::Error;

pub type Result<T> = std::result::Result<T, EpubError>;

/// Epub相关的错误类型
#[derive(Error, Debug)]
pub enum EpubError {
    /// 试图把rendition属性设置为不在允许集合中的值
    #[error("不支持的rendition值: {property} = {value:?}")]
    UnsupportedRenditionValue { property: &'static str, value: String },

    /// itemref尚未挂接到脊柱上，无法回溯到所属的包
    #[error("itemref未挂接到脊柱: {0}")]
    ItemrefNotAttached(String),

    #[error("脊柱位置越界: {index}，脊柱长度 {len}")]
    SpineIndexOutOfRange { index: usize, len: usize },

    #[error("XML解析错误: {0}")]
    XmlError(#[from] quick_xml::Error),

    #[error("OPF文件解析错误: {0}")]
    OpfParseError(String),

    #[error("配置文件错误: {0}")]
    ConfigError(String),
}

impl EpubError {
    /// 是否为rendition取值校验错误
    pub fn is_unsupported_rendition_value(&self) -> bool {
        matches!(self, EpubError::UnsupportedRenditionValue { .. })
    }
}
