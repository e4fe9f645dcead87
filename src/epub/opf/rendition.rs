//! rendition 属性模块
//!
//! EPUB3 固定版式词表定义了 `layout`、`orientation`、`spread` 三个枚举属性。
//! 同一个逻辑取值有两种存放位置：
//!
//! - 包级别：`<meta property="rendition:layout">pre-paginated</meta>`，存放在 [`Metadata::metas`]；
//! - itemref 级别：`properties="rendition:layout-pre-paginated"`，存放在 [`Itemref::properties`]。
//!
//! 宿主类型只需实现取值、写入、清除三个原语，其余访问方法
//! （类型化的 getter/setter、按取值强制设置、按取值判断）由 [`Rendition`] 和
//! [`RenditionMut`] 的默认方法统一提供。itemref 本地未设置时回退到所属包的元数据。
//!
//! 宿主注册：
//!
//! | 宿主 | 存放位置 | 回退 |
//! |---|---|---|
//! | [`Metadata`] | `metas` | 默认值 |
//! | [`ItemrefRendition`] / [`ItemrefRenditionMut`] | `Itemref::properties` | 包级 [`Metadata`] |

use crate::epub::error::{EpubError, Result};
use crate::epub::opf::metadata::{Meta, Metadata};
use crate::epub::opf::spine::Itemref;
use std::fmt;
use std::str::FromStr;
use tracing::debug;

/// rendition 词表的前缀名
pub const PREFIX_KEY: &str = "rendition";
/// rendition 词表的URI
pub const PREFIX_VALUE: &str = "http://www.idpf.org/vocab/rendition/#";

pub const REFLOWABLE: &str = "reflowable";
pub const PRE_PAGINATED: &str = "pre-paginated";
pub const AUTO: &str = "auto";
pub const LANDSCAPE: &str = "landscape";
pub const PORTRAIT: &str = "portrait";
pub const NONE: &str = "none";
pub const BOTH: &str = "both";

const LAYOUT_VALUES: [&str; 2] = [REFLOWABLE, PRE_PAGINATED];
const ORIENTATION_VALUES: [&str; 3] = [AUTO, LANDSCAPE, PORTRAIT];
const SPREAD_VALUES: [&str; 5] = [AUTO, NONE, LANDSCAPE, PORTRAIT, BOTH];

/// rendition 枚举属性
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RenditionProperty {
    Layout,
    Orientation,
    Spread,
}

impl RenditionProperty {
    pub const ALL: [RenditionProperty; 3] = [
        RenditionProperty::Layout,
        RenditionProperty::Orientation,
        RenditionProperty::Spread,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            RenditionProperty::Layout => "layout",
            RenditionProperty::Orientation => "orientation",
            RenditionProperty::Spread => "spread",
        }
    }

    /// 允许的取值，第一个为默认值
    pub fn values(&self) -> &'static [&'static str] {
        match self {
            RenditionProperty::Layout => &LAYOUT_VALUES,
            RenditionProperty::Orientation => &ORIENTATION_VALUES,
            RenditionProperty::Spread => &SPREAD_VALUES,
        }
    }

    pub fn default_value(&self) -> &'static str {
        self.values()[0]
    }

    /// 包级 meta 的 `property` 值，如 `rendition:layout`
    pub fn meta_property(&self) -> &'static str {
        match self {
            RenditionProperty::Layout => "rendition:layout",
            RenditionProperty::Orientation => "rendition:orientation",
            RenditionProperty::Spread => "rendition:spread",
        }
    }

    /// itemref `properties` 中的前缀，如 `rendition:layout-`
    pub fn token_prefix(&self) -> &'static str {
        match self {
            RenditionProperty::Layout => "rendition:layout-",
            RenditionProperty::Orientation => "rendition:orientation-",
            RenditionProperty::Spread => "rendition:spread-",
        }
    }

    /// itemref `properties` 中的完整写法，如 `rendition:layout-pre-paginated`
    pub fn token(&self, value: &str) -> String {
        format!("{}{}", self.token_prefix(), value)
    }

    /// 若 `value` 属于允许集合，返回表中对应的静态字符串
    pub fn canonical(&self, value: &str) -> Option<&'static str> {
        self.values().iter().copied().find(|v| *v == value)
    }

    /// 校验取值
    pub fn validate(&self, value: &str) -> Result<&'static str> {
        self.canonical(value)
            .ok_or_else(|| EpubError::UnsupportedRenditionValue {
                property: self.name(),
                value: value.to_string(),
            })
    }

    /// 表中第一个不等于 `value` 的取值
    ///
    /// 只有两个取值的 `layout` 上这就是"另一个"取值；对三个及以上取值的属性，
    /// 结果只是表中靠前的那个。
    pub fn other_value(&self, value: &str) -> &'static str {
        self.values()
            .iter()
            .copied()
            .find(|v| *v != value)
            .unwrap_or_else(|| self.default_value())
    }
}

impl fmt::Display for RenditionProperty {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for RenditionProperty {
    type Err = String;

    /// 接受 `layout` 或 `rendition:layout` 两种写法
    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        let name = s.strip_prefix("rendition:").unwrap_or(s);
        RenditionProperty::ALL
            .iter()
            .copied()
            .find(|p| p.name() == name)
            .ok_or_else(|| format!("未知的rendition属性: {}", s))
    }
}

/// 属性与取值到访问方法名的对应表，交给 `$generate` 宏展开
macro_rules! rendition_table {
    ($generate:ident) => {
        $generate! {
            Layout {
                layout, set_layout, clear_layout;
                REFLOWABLE => is_reflowable, make_reflowable, set_reflowable;
                PRE_PAGINATED => is_pre_paginated, make_pre_paginated, set_pre_paginated;
            }
            Orientation {
                orientation, set_orientation, clear_orientation;
                AUTO => is_orientation_auto, make_orientation_auto, set_orientation_auto;
                LANDSCAPE => is_orientation_landscape, make_orientation_landscape, set_orientation_landscape;
                PORTRAIT => is_orientation_portrait, make_orientation_portrait, set_orientation_portrait;
            }
            Spread {
                spread, set_spread, clear_spread;
                AUTO => is_spread_auto, make_spread_auto, set_spread_auto;
                NONE => is_spread_none, make_spread_none, set_spread_none;
                LANDSCAPE => is_spread_landscape, make_spread_landscape, set_spread_landscape;
                PORTRAIT => is_spread_portrait, make_spread_portrait, set_spread_portrait;
                BOTH => is_spread_both, make_spread_both, set_spread_both;
            }
        }
    };
}

macro_rules! rendition_readers {
    ($(
        $property:ident {
            $getter:ident, $setter:ident, $clearer:ident;
            $($value:ident => $predicate:ident, $maker:ident, $flag_setter:ident;)+
        }
    )+) => {
        $(
            #[doc = concat!("`", stringify!($getter), "` 的当前取值")]
            fn $getter(&self) -> &'static str {
                self.rendition(RenditionProperty::$property)
            }

            $(
                fn $predicate(&self) -> bool {
                    self.rendition(RenditionProperty::$property) == $value
                }
            )+
        )+
    };
}

macro_rules! rendition_writers {
    ($(
        $property:ident {
            $getter:ident, $setter:ident, $clearer:ident;
            $($value:ident => $predicate:ident, $maker:ident, $flag_setter:ident;)+
        }
    )+) => {
        $(
            #[doc = concat!("设置 `", stringify!($getter), "`，取值不在允许集合中时返回错误")]
            fn $setter(&mut self, value: &str) -> Result<()> {
                self.set_rendition(RenditionProperty::$property, Some(value))
            }

            fn $clearer(&mut self) {
                self.clear_rendition(RenditionProperty::$property)
            }

            $(
                fn $maker(&mut self) {
                    self.store_rendition(RenditionProperty::$property, $value)
                }

                fn $flag_setter(&mut self, flag: bool) {
                    self.set_rendition_flag(RenditionProperty::$property, $value, flag)
                }
            )+
        )+
    };
}

/// 可读取 rendition 属性的宿主
pub trait Rendition {
    /// 宿主自身存放的取值，仅考虑允许集合内的取值
    fn raw_rendition(&self, property: RenditionProperty) -> Option<&'static str>;

    /// 本地没有取值时使用的值
    fn inherited_rendition(&self, property: RenditionProperty) -> &'static str {
        property.default_value()
    }

    /// 解析后的取值，永不失败
    fn rendition(&self, property: RenditionProperty) -> &'static str {
        self.raw_rendition(property)
            .unwrap_or_else(|| self.inherited_rendition(property))
    }

    rendition_table!(rendition_readers);
}

/// 可写入 rendition 属性的宿主
pub trait RenditionMut: Rendition {
    /// 写入已校验的取值：移除同一属性的其它合法取值，缺失时追加，重复写入无副作用
    fn store_rendition(&mut self, property: RenditionProperty, value: &'static str);

    /// 移除宿主自身存放的全部取值
    fn clear_rendition(&mut self, property: RenditionProperty);

    /// `Some` 时校验后写入，`None` 时清除本地取值
    fn set_rendition(&mut self, property: RenditionProperty, value: Option<&str>) -> Result<()> {
        match value {
            Some(value) => {
                let value = property.validate(value)?;
                self.store_rendition(property, value);
            }
            None => self.clear_rendition(property),
        }
        Ok(())
    }

    /// `flag` 为真时设置为 `value`，否则设置为 [`RenditionProperty::other_value`]
    fn set_rendition_flag(&mut self, property: RenditionProperty, value: &'static str, flag: bool) {
        let target = if flag { value } else { property.other_value(value) };
        self.store_rendition(property, target);
    }

    rendition_table!(rendition_writers);
}

impl Rendition for Metadata {
    fn raw_rendition(&self, property: RenditionProperty) -> Option<&'static str> {
        let key = property.meta_property();
        self.metas
            .iter()
            .filter(|meta| meta.property == key)
            .find_map(|meta| property.canonical(&meta.content))
    }
}

impl RenditionMut for Metadata {
    fn store_rendition(&mut self, property: RenditionProperty, value: &'static str) {
        let key = property.meta_property();
        let before = self.metas.len();
        self.metas.retain(|meta| {
            meta.property != key
                || meta.content == value
                || property.canonical(&meta.content).is_none()
        });
        let pruned = before - self.metas.len();
        if pruned > 0 {
            debug!(property = key, value, pruned, "移除冲突的rendition meta");
        }

        let present = self
            .metas
            .iter()
            .any(|meta| meta.property == key && meta.content == value);
        if !present {
            self.metas.push(Meta::new(key, value));
        }
    }

    fn clear_rendition(&mut self, property: RenditionProperty) {
        let key = property.meta_property();
        self.metas.retain(|meta| meta.property != key);
    }
}

/// itemref 的 rendition 只读视图，本地未设置时回退到包级元数据
#[derive(Debug, Clone, Copy)]
pub struct ItemrefRendition<'a> {
    itemref: &'a Itemref,
    metadata: &'a Metadata,
}

impl<'a> ItemrefRendition<'a> {
    pub(crate) fn new(itemref: &'a Itemref, metadata: &'a Metadata) -> Self {
        Self { itemref, metadata }
    }

    pub fn itemref(&self) -> &'a Itemref {
        self.itemref
    }
}

impl Rendition for ItemrefRendition<'_> {
    fn raw_rendition(&self, property: RenditionProperty) -> Option<&'static str> {
        self.itemref.local_rendition(property)
    }

    fn inherited_rendition(&self, property: RenditionProperty) -> &'static str {
        self.metadata.rendition(property)
    }
}

/// itemref 的 rendition 读写视图
///
/// 可变借用 itemref，只读借用包级元数据；写入只影响 itemref 自身的 `properties`。
#[derive(Debug)]
pub struct ItemrefRenditionMut<'a> {
    itemref: &'a mut Itemref,
    metadata: &'a Metadata,
}

impl<'a> ItemrefRenditionMut<'a> {
    pub(crate) fn new(itemref: &'a mut Itemref, metadata: &'a Metadata) -> Self {
        Self { itemref, metadata }
    }

    pub fn itemref(&self) -> &Itemref {
        &*self.itemref
    }
}

impl Rendition for ItemrefRenditionMut<'_> {
    fn raw_rendition(&self, property: RenditionProperty) -> Option<&'static str> {
        self.itemref.local_rendition(property)
    }

    fn inherited_rendition(&self, property: RenditionProperty) -> &'static str {
        self.metadata.rendition(property)
    }
}

impl RenditionMut for ItemrefRenditionMut<'_> {
    fn store_rendition(&mut self, property: RenditionProperty, value: &'static str) {
        self.itemref.store_local_rendition(property, value);
    }

    fn clear_rendition(&mut self, property: RenditionProperty) {
        self.itemref.clear_local_rendition(property);
    }
}
