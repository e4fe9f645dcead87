//! 包文档模块
//!
//! [`Package`] 拥有元数据、清单和脊柱，并维护 `prefix` 属性声明的词表前缀映射。

use crate::epub::error::{EpubError, Result};
use crate::epub::opf::manifest::Manifest;
use crate::epub::opf::metadata::Metadata;
use crate::epub::opf::rendition::{ItemrefRendition, ItemrefRenditionMut, PREFIX_KEY, PREFIX_VALUE};
use crate::epub::opf::spine::{Itemref, Spine};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tracing::warn;

/// 维护词表前缀映射的类型
pub trait PrefixHost {
    /// 前缀名到URI的映射
    fn prefixes(&self) -> &BTreeMap<String, String>;

    fn prefixes_mut(&mut self) -> &mut BTreeMap<String, String>;

    /// 是否声明了 rendition 词表（固定版式）
    fn using_fixed_layout(&self) -> bool {
        self.prefixes()
            .get(PREFIX_KEY)
            .is_some_and(|uri| uri == PREFIX_VALUE)
    }

    /// 声明或移除 rendition 词表前缀
    fn set_using_fixed_layout(&mut self, using_fixed_layout: bool) {
        if using_fixed_layout {
            self.prefixes_mut()
                .insert(PREFIX_KEY.to_string(), PREFIX_VALUE.to_string());
        } else {
            self.prefixes_mut().remove(PREFIX_KEY);
        }
    }

    /// 序列化为 `prefix` 属性文本，如 `rendition: http://www.idpf.org/vocab/rendition/#`
    fn prefix_attribute(&self) -> String {
        self.prefixes()
            .iter()
            .map(|(key, uri)| format!("{}: {}", key, uri))
            .collect::<Vec<_>>()
            .join(" ")
    }
}

/// OPF包文档
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Package {
    /// EPUB版本
    pub version: String,
    /// 词表前缀映射
    pub prefix: BTreeMap<String, String>,
    /// 元数据
    pub metadata: Metadata,
    /// 清单项(文件列表)
    pub manifest: Manifest,
    /// 脊柱(阅读顺序)
    pub spine: Spine,
}

impl PrefixHost for Package {
    fn prefixes(&self) -> &BTreeMap<String, String> {
        &self.prefix
    }

    fn prefixes_mut(&mut self) -> &mut BTreeMap<String, String> {
        &mut self.prefix
    }
}

impl Package {
    pub fn new() -> Self {
        Self::default()
    }

    /// `unique-identifier` 属性，保存在元数据中
    pub fn unique_identifier(&self) -> Option<&str> {
        self.metadata.unique_identifier.as_deref()
    }

    pub fn set_unique_identifier(&mut self, id: Option<String>) {
        self.metadata.unique_identifier = id;
    }

    /// 脊柱中第 `index` 项的 rendition 只读视图，未在本地设置的属性回退到包级元数据
    pub fn itemref_rendition(&self, index: usize) -> Result<ItemrefRendition<'_>> {
        let itemref = self
            .spine
            .get(index)
            .ok_or(EpubError::SpineIndexOutOfRange {
                index,
                len: self.spine.len(),
            })?;
        Ok(ItemrefRendition::new(itemref, &self.metadata))
    }

    /// 脊柱中第 `index` 项的 rendition 读写视图
    pub fn itemref_rendition_mut(&mut self, index: usize) -> Result<ItemrefRenditionMut<'_>> {
        let len = self.spine.len();
        let Package { metadata, spine, .. } = self;
        let itemref = spine
            .get_mut(index)
            .ok_or(EpubError::SpineIndexOutOfRange { index, len })?;
        Ok(ItemrefRenditionMut::new(itemref, metadata))
    }

    /// 解析 `prefix` 属性文本并合并进前缀映射
    ///
    /// 格式为以空白分隔的 `前缀: URI` 对，格式错误的片段被跳过。
    pub fn parse_prefix_attribute(&mut self, attribute: &str) {
        let mut tokens = attribute.split_whitespace();
        while let Some(token) = tokens.next() {
            let Some(key) = token.strip_suffix(':') else {
                warn!(token, "prefix属性格式错误，跳过");
                continue;
            };
            match tokens.next() {
                Some(uri) => {
                    self.prefix.insert(key.to_string(), uri.to_string());
                }
                None => warn!(key, "prefix属性缺少URI"),
            }
        }
    }
}

impl Itemref {
    /// 通过脊柱位置回溯到所属的包，得到 rendition 只读视图
    ///
    /// 挂接关系按脊柱位置与 `idref` 判定：该包脊柱在 `position` 处的itemref与自身
    /// `idref` 相同即视为挂接，包本身没有身份标记，因此另一个包中同位置、同 `idref`
    /// 的itemref（例如克隆出的包）同样能解析。位置缺失或不匹配时返回
    /// [`EpubError::ItemrefNotAttached`]。
    pub fn rendition_in<'a>(&'a self, package: &'a Package) -> Result<ItemrefRendition<'a>> {
        let attached = self
            .position()
            .and_then(|position| package.spine.get(position))
            .is_some_and(|itemref| itemref.idref == self.idref);
        if !attached {
            return Err(EpubError::ItemrefNotAttached(self.idref.clone()));
        }
        Ok(ItemrefRendition::new(self, &package.metadata))
    }
}
