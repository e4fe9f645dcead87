//! 脊柱模块
//!
//! 提供EPUB包中阅读顺序（脊柱）的结构定义。itemref 的 `properties` 中可以携带
//! 形如 `rendition:layout-pre-paginated` 的 rendition 覆盖值。

use crate::epub::opf::manifest::{Item, Manifest};
use crate::epub::opf::rendition::RenditionProperty;
use serde::{Deserialize, Serialize};
use tracing::debug;

/// 脊柱(阅读顺序)
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Spine {
    /// 脊柱的目录引用(EPUB2 的 NCX)
    pub toc: Option<String>,
    pub page_progression_direction: Option<String>,
    itemrefs: Vec<Itemref>,
}

impl Spine {
    pub fn new() -> Self {
        Self::default()
    }

    /// 追加itemref并记录其在脊柱中的位置
    pub fn push(&mut self, mut itemref: Itemref) -> usize {
        let position = self.itemrefs.len();
        itemref.position = Some(position);
        self.itemrefs.push(itemref);
        position
    }

    pub fn itemrefs(&self) -> &[Itemref] {
        &self.itemrefs
    }

    pub fn get(&self, index: usize) -> Option<&Itemref> {
        self.itemrefs.get(index)
    }

    /// 可变访问已挂接的itemref，其脊柱位置不可修改
    ///
    /// 整体替换为新的 [`Itemref`] 会丢失位置记录。
    pub fn get_mut(&mut self, index: usize) -> Option<&mut Itemref> {
        self.itemrefs.get_mut(index)
    }

    pub fn len(&self) -> usize {
        self.itemrefs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.itemrefs.is_empty()
    }
}

/// 脊柱项信息
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Itemref {
    /// 引用的清单项ID
    pub idref: String,
    pub id: Option<String>,
    /// 是否线性阅读
    pub linear: bool,
    /// `properties` 属性中以空白分隔的各项
    pub properties: Vec<String>,
    /// 在所属脊柱中的位置，未挂接时为 `None`
    #[serde(default)]
    position: Option<usize>,
}

impl Itemref {
    /// 创建新的脊柱项
    pub fn new(idref: impl Into<String>) -> Self {
        Self {
            idref: idref.into(),
            id: None,
            linear: true,
            properties: Vec::new(),
            position: None,
        }
    }

    /// 创建指定线性属性的脊柱项
    pub fn with_linear(idref: impl Into<String>, linear: bool) -> Self {
        Self {
            linear,
            ..Self::new(idref)
        }
    }

    pub fn with_properties<I, S>(mut self, properties: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.properties = properties.into_iter().map(Into::into).collect();
        self
    }

    /// 在所属脊柱中的位置
    pub fn position(&self) -> Option<usize> {
        self.position
    }

    pub fn is_attached(&self) -> bool {
        self.position.is_some()
    }

    pub fn is_linear(&self) -> bool {
        self.linear
    }

    /// 检查是否包含指定属性
    pub fn has_property(&self, property: &str) -> bool {
        self.properties.iter().any(|p| p == property)
    }

    /// 序列化为 `properties` 属性文本
    pub fn properties_attribute(&self) -> String {
        self.properties.join(" ")
    }

    /// 引用的清单项
    pub fn item<'a>(&self, manifest: &'a Manifest) -> Option<&'a Item> {
        manifest.item(&self.idref)
    }

    /// itemref 自身 `properties` 中的 rendition 取值，不在允许集合中的取值视为不存在
    pub fn local_rendition(&self, property: RenditionProperty) -> Option<&'static str> {
        let prefix = property.token_prefix();
        self.properties
            .iter()
            .filter_map(|p| p.strip_prefix(prefix))
            .find_map(|value| property.canonical(value))
    }

    /// 写入本地取值：移除同一属性的其它合法取值，缺失时追加
    pub(crate) fn store_local_rendition(&mut self, property: RenditionProperty, value: &'static str) {
        let prefix = property.token_prefix();
        let before = self.properties.len();
        self.properties.retain(|p| match p.strip_prefix(prefix) {
            Some(existing) => existing == value || property.canonical(existing).is_none(),
            None => true,
        });
        let pruned = before - self.properties.len();
        if pruned > 0 {
            debug!(idref = %self.idref, property = property.name(), pruned, "移除冲突的rendition属性");
        }

        let token = property.token(value);
        if !self.has_property(&token) {
            self.properties.push(token);
        }
    }

    /// 移除本地覆盖值，回退到继承值
    pub(crate) fn clear_local_rendition(&mut self, property: RenditionProperty) {
        let prefix = property.token_prefix();
        let before = self.properties.len();
        self.properties.retain(|p| !p.starts_with(prefix));
        if before != self.properties.len() {
            debug!(idref = %self.idref, property = property.name(), "清除itemref的rendition覆盖值");
        }
    }
}
