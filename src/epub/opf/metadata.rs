//! 元数据处理模块
//!
//! 提供OPF包文档 `<metadata>` 部分的对象模型：Dublin Core 元素、meta、link，
//! 以及复合标题的解析规则。rendition 属性在包级别以 meta 的形式存放于此，
//! 相关访问方法见 [`Rendition`](crate::epub::opf::Rendition)。

use crate::epub::opf::refinement::Refinable;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

/// 为持有 `refiners` 字段的结构体实现 [`Refinable`]
macro_rules! impl_refinable {
    ($($ty:ty),* $(,)?) => {
        $(
            impl Refinable for $ty {
                fn refiners(&self) -> &[Meta] {
                    &self.refiners
                }

                fn refiners_mut(&mut self) -> &mut Vec<Meta> {
                    &mut self.refiners
                }
            }
        )*
    };
}

impl_refinable!(Identifier, Title, Dcmes, Meta, Link);

/// 标识符信息
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Identifier {
    /// 标识符值
    pub content: String,
    /// 元素ID（用于关联refines元数据）
    pub id: Option<String>,
    /// 精化该元素的meta
    #[serde(default)]
    pub refiners: Vec<Meta>,
}

impl Identifier {
    pub fn new(content: impl Into<String>) -> Self {
        Self {
            content: content.into(),
            ..Self::default()
        }
    }

    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = Some(id.into());
        self
    }
}

/// 标题类型，取自 `title-type` 精化
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TitleType {
    Main,
    Short,
    Collection,
    Edition,
    Extended,
    Subtitle,
    Other,
}

impl TitleType {
    pub fn as_str(&self) -> &'static str {
        match self {
            TitleType::Main => "main",
            TitleType::Short => "short",
            TitleType::Collection => "collection",
            TitleType::Edition => "edition",
            TitleType::Extended => "extended",
            TitleType::Subtitle => "subtitle",
            TitleType::Other => "other",
        }
    }
}

impl FromStr for TitleType {
    type Err = std::convert::Infallible;

    /// 未知的取值归为 [`TitleType::Other`]
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(match s.trim() {
            "main" => TitleType::Main,
            "short" => TitleType::Short,
            "collection" => TitleType::Collection,
            "edition" => TitleType::Edition,
            "extended" => TitleType::Extended,
            "subtitle" => TitleType::Subtitle,
            _ => TitleType::Other,
        })
    }
}

/// 标题元素 `<dc:title>`
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Title {
    pub content: String,
    pub id: Option<String>,
    pub lang: Option<String>,
    pub dir: Option<String>,
    #[serde(default)]
    pub refiners: Vec<Meta>,
}

impl Title {
    pub fn new(content: impl Into<String>) -> Self {
        Self {
            content: content.into(),
            ..Self::default()
        }
    }

    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = Some(id.into());
        self
    }

    /// 标题类型，由第一个 `title-type` 精化决定；没有该精化时返回 `None`
    pub fn kind(&self) -> Option<TitleType> {
        self.title_type()
            .and_then(|meta| meta.content.parse::<TitleType>().ok())
    }

    /// `display-seq` 精化的数值
    ///
    /// 非数字内容按 0 处理，与整数前缀解析的行为一致。
    pub fn display_order(&self) -> Option<i64> {
        self.display_seq().map(|meta| leading_integer(&meta.content))
    }

    /// 按 `display-seq` 升序比较，没有 `display-seq` 的标题排在所有带序号的标题之后
    pub fn compare_display_order(&self, other: &Title) -> Ordering {
        match (self.display_order(), other.display_order()) {
            (Some(a), Some(b)) => a.cmp(&b),
            (Some(_), None) => Ordering::Less,
            (None, Some(_)) => Ordering::Greater,
            (None, None) => Ordering::Equal,
        }
    }
}

/// 通用 Dublin Core 元素（语言、创建者、出版社等）
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Dcmes {
    pub content: String,
    pub id: Option<String>,
    pub lang: Option<String>,
    pub dir: Option<String>,
    #[serde(default)]
    pub refiners: Vec<Meta>,
}

impl Dcmes {
    pub fn new(content: impl Into<String>) -> Self {
        Self {
            content: content.into(),
            ..Self::default()
        }
    }

    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = Some(id.into());
        self
    }
}

/// `<meta>` 元素
///
/// 没有 `refines` 的 meta 是一条独立的断言（primary expression），
/// 有 `refines` 的 meta 是对另一元素的补充说明（subexpression）。
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Meta {
    /// property属性值（如 `dcterms:modified`、`rendition:layout`、`role`）
    pub property: String,
    /// 标签内容
    pub content: String,
    /// 被精化的元素ID（不包含#前缀）
    pub refines: Option<String>,
    pub scheme: Option<String>,
    pub id: Option<String>,
    #[serde(default)]
    pub refiners: Vec<Meta>,
}

impl Meta {
    /// 创建独立的meta
    pub fn new(property: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            property: property.into(),
            content: content.into(),
            ..Self::default()
        }
    }

    /// 创建精化指定元素的meta，`refines` 可带或不带 `#` 前缀
    pub fn refining(
        refines: impl Into<String>,
        property: impl Into<String>,
        content: impl Into<String>,
    ) -> Self {
        let refines = refines.into();
        let refines = refines.strip_prefix('#').map(str::to_string).unwrap_or(refines);
        Self {
            refines: Some(refines),
            ..Self::new(property, content)
        }
    }

    pub fn with_scheme(mut self, scheme: impl Into<String>) -> Self {
        self.scheme = Some(scheme.into());
        self
    }

    pub fn is_refines(&self) -> bool {
        self.refines.is_some()
    }

    pub fn is_subexpression(&self) -> bool {
        self.is_refines()
    }

    pub fn is_primary_expression(&self) -> bool {
        !self.is_subexpression()
    }
}

/// `<link>` 元素
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Link {
    pub href: String,
    pub rel: Option<String>,
    pub id: Option<String>,
    pub refines: Option<String>,
    pub media_type: Option<String>,
    pub iri: Option<String>,
    #[serde(default)]
    pub refiners: Vec<Meta>,
}

impl fmt::Display for Identifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.content)
    }
}

impl fmt::Display for Title {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.content)
    }
}

impl fmt::Display for Dcmes {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.content)
    }
}

impl fmt::Display for Meta {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.content)
    }
}

/// Dublin Core 元素集合的名称
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DcElement {
    Identifiers,
    Titles,
    Languages,
    Contributors,
    Coverages,
    Creators,
    Dates,
    Descriptions,
    Formats,
    Publishers,
    Relations,
    Rights,
    Sources,
    Subjects,
    Types,
}

impl DcElement {
    pub const ALL: [DcElement; 15] = [
        DcElement::Identifiers,
        DcElement::Titles,
        DcElement::Languages,
        DcElement::Contributors,
        DcElement::Coverages,
        DcElement::Creators,
        DcElement::Dates,
        DcElement::Descriptions,
        DcElement::Formats,
        DcElement::Publishers,
        DcElement::Relations,
        DcElement::Rights,
        DcElement::Sources,
        DcElement::Subjects,
        DcElement::Types,
    ];

    /// 集合名（复数形式）
    pub fn as_str(&self) -> &'static str {
        match self {
            DcElement::Identifiers => "identifiers",
            DcElement::Titles => "titles",
            DcElement::Languages => "languages",
            DcElement::Contributors => "contributors",
            DcElement::Coverages => "coverages",
            DcElement::Creators => "creators",
            DcElement::Dates => "dates",
            DcElement::Descriptions => "descriptions",
            DcElement::Formats => "formats",
            DcElement::Publishers => "publishers",
            DcElement::Relations => "relations",
            DcElement::Rights => "rights",
            DcElement::Sources => "sources",
            DcElement::Subjects => "subjects",
            DcElement::Types => "types",
        }
    }
}

/// 某一 Dublin Core 集合的只读视图
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(untagged)]
pub enum DcCollection<'a> {
    Identifiers(&'a [Identifier]),
    Titles(&'a [Title]),
    Elements(&'a [Dcmes]),
}

impl DcCollection<'_> {
    pub fn len(&self) -> usize {
        match self {
            DcCollection::Identifiers(items) => items.len(),
            DcCollection::Titles(items) => items.len(),
            DcCollection::Elements(items) => items.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// 各元素的文本内容
    pub fn contents(&self) -> Vec<&str> {
        match self {
            DcCollection::Identifiers(items) => items.iter().map(|i| i.content.as_str()).collect(),
            DcCollection::Titles(items) => items.iter().map(|t| t.content.as_str()).collect(),
            DcCollection::Elements(items) => items.iter().map(|e| e.content.as_str()).collect(),
        }
    }
}

/// OPF文件中的元数据信息
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Metadata {
    /// 包的唯一标识符所指向的元素ID
    pub unique_identifier: Option<String>,
    pub dc_identifiers: Vec<Identifier>,
    pub dc_titles: Vec<Title>,
    pub dc_languages: Vec<Dcmes>,
    pub dc_contributors: Vec<Dcmes>,
    pub dc_coverages: Vec<Dcmes>,
    pub dc_creators: Vec<Dcmes>,
    pub dc_dates: Vec<Dcmes>,
    pub dc_descriptions: Vec<Dcmes>,
    pub dc_formats: Vec<Dcmes>,
    pub dc_publishers: Vec<Dcmes>,
    pub dc_relations: Vec<Dcmes>,
    pub dc_rights: Vec<Dcmes>,
    pub dc_sources: Vec<Dcmes>,
    pub dc_subjects: Vec<Dcmes>,
    pub dc_types: Vec<Dcmes>,
    /// 按文档顺序排列的meta，靠后的条目更新
    pub metas: Vec<Meta>,
    pub links: Vec<Link>,
}

impl Metadata {
    /// 创建新的元数据实例
    pub fn new() -> Self {
        Self::default()
    }

    /// 获取复合标题
    ///
    /// 依次尝试：extended 类型的标题；所有带 `display-seq` 的标题按序号以换行拼接；
    /// main 类型的标题；全部标题按序号规则排序后以空格拼接。返回第一个非空结果。
    pub fn title(&self) -> String {
        let extended = self.extended_title();
        if !extended.is_empty() {
            return extended;
        }

        let mut sequenced: Vec<&Title> = self
            .dc_titles
            .iter()
            .filter(|title| title.display_seq().is_some())
            .collect();
        sequenced.sort_by(|a, b| a.compare_display_order(b));
        let composited = join_contents(&sequenced, "\n");
        if !composited.is_empty() {
            return composited;
        }

        let main = self.main_title();
        if !main.is_empty() {
            return main;
        }

        let mut all: Vec<&Title> = self.dc_titles.iter().collect();
        all.sort_by(|a, b| a.compare_display_order(b));
        join_contents(&all, " ")
    }

    /// 指定类型的标题，按序号规则排序后以空格拼接
    pub fn titles_of_kind(&self, kind: TitleType) -> String {
        let mut titles: Vec<&Title> = self
            .dc_titles
            .iter()
            .filter(|title| title.kind() == Some(kind))
            .collect();
        titles.sort_by(|a, b| a.compare_display_order(b));
        join_contents(&titles, " ")
    }

    pub fn main_title(&self) -> String {
        self.titles_of_kind(TitleType::Main)
    }

    pub fn short_title(&self) -> String {
        self.titles_of_kind(TitleType::Short)
    }

    pub fn collection_title(&self) -> String {
        self.titles_of_kind(TitleType::Collection)
    }

    pub fn edition_title(&self) -> String {
        self.titles_of_kind(TitleType::Edition)
    }

    pub fn extended_title(&self) -> String {
        self.titles_of_kind(TitleType::Extended)
    }

    pub fn subtitle(&self) -> String {
        self.titles_of_kind(TitleType::Subtitle)
    }

    /// 获取指定的 Dublin Core 集合
    pub fn collection(&self, element: DcElement) -> DcCollection<'_> {
        match element {
            DcElement::Identifiers => DcCollection::Identifiers(&self.dc_identifiers),
            DcElement::Titles => DcCollection::Titles(&self.dc_titles),
            other => match self.dcmes(other) {
                Some(elements) => DcCollection::Elements(elements),
                None => DcCollection::Elements(&[]),
            },
        }
    }

    /// 通用 Dublin Core 集合；标识符和标题有各自的类型，返回 `None`
    pub fn dcmes(&self, element: DcElement) -> Option<&Vec<Dcmes>> {
        let collection = match element {
            DcElement::Identifiers | DcElement::Titles => return None,
            DcElement::Languages => &self.dc_languages,
            DcElement::Contributors => &self.dc_contributors,
            DcElement::Coverages => &self.dc_coverages,
            DcElement::Creators => &self.dc_creators,
            DcElement::Dates => &self.dc_dates,
            DcElement::Descriptions => &self.dc_descriptions,
            DcElement::Formats => &self.dc_formats,
            DcElement::Publishers => &self.dc_publishers,
            DcElement::Relations => &self.dc_relations,
            DcElement::Rights => &self.dc_rights,
            DcElement::Sources => &self.dc_sources,
            DcElement::Subjects => &self.dc_subjects,
            DcElement::Types => &self.dc_types,
        };
        Some(collection)
    }

    pub fn dcmes_mut(&mut self, element: DcElement) -> Option<&mut Vec<Dcmes>> {
        let collection = match element {
            DcElement::Identifiers | DcElement::Titles => return None,
            DcElement::Languages => &mut self.dc_languages,
            DcElement::Contributors => &mut self.dc_contributors,
            DcElement::Coverages => &mut self.dc_coverages,
            DcElement::Creators => &mut self.dc_creators,
            DcElement::Dates => &mut self.dc_dates,
            DcElement::Descriptions => &mut self.dc_descriptions,
            DcElement::Formats => &mut self.dc_formats,
            DcElement::Publishers => &mut self.dc_publishers,
            DcElement::Relations => &mut self.dc_relations,
            DcElement::Rights => &mut self.dc_rights,
            DcElement::Sources => &mut self.dc_sources,
            DcElement::Subjects => &mut self.dc_subjects,
            DcElement::Types => &mut self.dc_types,
        };
        Some(collection)
    }

    /// 全部 Dublin Core 集合的快照
    pub fn to_hash(&self) -> BTreeMap<DcElement, DcCollection<'_>> {
        DcElement::ALL
            .iter()
            .map(|&element| (element, self.collection(element)))
            .collect()
    }

    /// 不精化其它元素的meta
    pub fn primary_metas(&self) -> Vec<&Meta> {
        self.metas
            .iter()
            .filter(|meta| meta.is_primary_expression())
            .collect()
    }

    /// `unique_identifier` 指向的标识符元素
    pub fn unique_identifier_element(&self) -> Option<&Identifier> {
        let id = self.unique_identifier.as_deref()?;
        self.dc_identifiers
            .iter()
            .find(|identifier| identifier.id.as_deref() == Some(id))
    }

    /// 按ID查找可被精化的元素
    pub fn refinable_mut(&mut self, id: &str) -> Option<&mut dyn Refinable> {
        let matches = |element_id: &Option<String>| element_id.as_deref() == Some(id);

        if let Some(i) = self.dc_identifiers.iter().position(|e| matches(&e.id)) {
            return Some(&mut self.dc_identifiers[i] as &mut dyn Refinable);
        }
        if let Some(i) = self.dc_titles.iter().position(|e| matches(&e.id)) {
            return Some(&mut self.dc_titles[i] as &mut dyn Refinable);
        }
        for element in DcElement::ALL {
            let position = self
                .dcmes(element)
                .and_then(|collection| collection.iter().position(|e| matches(&e.id)));
            if let Some(i) = position {
                return self
                    .dcmes_mut(element)
                    .map(|collection| &mut collection[i] as &mut dyn Refinable);
            }
        }
        if let Some(i) = self.metas.iter().position(|e| matches(&e.id)) {
            return Some(&mut self.metas[i] as &mut dyn Refinable);
        }
        let i = self.links.iter().position(|e| matches(&e.id))?;
        Some(&mut self.links[i] as &mut dyn Refinable)
    }
}

fn join_contents(titles: &[&Title], separator: &str) -> String {
    titles
        .iter()
        .map(|title| title.content.as_str())
        .collect::<Vec<_>>()
        .join(separator)
}

/// 解析字符串开头的整数，忽略前导空白；没有数字时返回0
fn leading_integer(s: &str) -> i64 {
    let s = s.trim_start();
    let (sign, digits) = match s.strip_prefix('-') {
        Some(rest) => (-1, rest),
        None => (1, s.strip_prefix('+').unwrap_or(s)),
    };
    let end = digits
        .find(|c: char| !c.is_ascii_digit())
        .unwrap_or(digits.len());
    digits[..end].parse::<i64>().map(|n| sign * n).unwrap_or(0)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn typed_title(content: &str, id: &str, kind: &str) -> Title {
        let mut title = Title::new(content).with_id(id);
        title.add_refiner(Meta::refining(id, "title-type", kind));
        title
    }

    fn sequenced(mut title: Title, seq: &str) -> Title {
        let id = title.id.clone().unwrap_or_default();
        title.add_refiner(Meta::refining(id, "display-seq", seq));
        title
    }

    #[test]
    fn test_extended_title_wins() {
        let mut metadata = Metadata::new();
        metadata.dc_titles.push(typed_title("Main", "t1", "main"));
        metadata.dc_titles.push(typed_title("Ext", "t2", "extended"));

        assert_eq!(metadata.title(), "Ext");
        assert_eq!(metadata.main_title(), "Main");
    }

    #[test]
    fn test_display_seq_titles_joined_with_newline() {
        let mut metadata = Metadata::new();
        metadata.dc_titles.push(typed_title("Main", "t1", "main"));
        metadata.dc_titles.push(typed_title("Ext", "t2", "extended"));
        assert_eq!(metadata.title(), "Ext");

        metadata.dc_titles.retain(|t| t.kind() != Some(TitleType::Extended));
        metadata
            .dc_titles
            .push(sequenced(typed_title("Second", "t3", "main"), "2"));
        metadata
            .dc_titles
            .push(sequenced(typed_title("First", "t4", "main"), "1"));

        assert_eq!(metadata.title(), "First\nSecond");
    }

    #[test]
    fn test_main_title_before_unsorted_fallback() {
        let mut metadata = Metadata::new();
        metadata.dc_titles.push(Title::new("Untyped"));
        metadata.dc_titles.push(typed_title("Main", "t1", "main"));

        assert_eq!(metadata.title(), "Main");
    }

    #[test]
    fn test_fallback_joins_all_titles_with_space() {
        let mut metadata = Metadata::new();
        metadata.dc_titles.push(Title::new("Alice's"));
        metadata.dc_titles.push(Title::new("Adventures"));

        assert_eq!(metadata.title(), "Alice's Adventures");
        assert_eq!(Metadata::new().title(), "");
    }

    #[test]
    fn test_titles_without_seq_sort_last_and_non_numeric_is_zero() {
        let a = sequenced(Title::new("A").with_id("a"), "3");
        let b = Title::new("B");
        let c = sequenced(Title::new("C").with_id("c"), "abc");

        assert_eq!(a.compare_display_order(&b), Ordering::Less);
        assert_eq!(b.compare_display_order(&a), Ordering::Greater);
        assert_eq!(c.display_order(), Some(0));
        assert_eq!(c.compare_display_order(&a), Ordering::Less);
        assert_eq!(leading_integer(" 12th"), 12);
    }

    #[test]
    fn test_subtitle() {
        let mut metadata = Metadata::new();
        metadata.dc_titles.push(typed_title("Main", "t1", "main"));
        metadata
            .dc_titles
            .push(sequenced(typed_title("Part B", "t2", "subtitle"), "2"));
        metadata
            .dc_titles
            .push(sequenced(typed_title("Part A", "t3", "subtitle"), "1"));

        assert_eq!(metadata.subtitle(), "Part A Part B");
    }

    #[test]
    fn test_primary_metas_excludes_refinements() {
        let mut metadata = Metadata::new();
        metadata.metas.push(Meta::new("dcterms:modified", "2024-01-01T00:00:00Z"));
        metadata.metas.push(Meta::refining("#creator", "role", "aut"));
        metadata.metas.push(Meta::new("rendition:layout", "pre-paginated"));

        let primary: Vec<&str> = metadata
            .primary_metas()
            .iter()
            .map(|m| m.property.as_str())
            .collect();
        assert_eq!(primary, vec!["dcterms:modified", "rendition:layout"]);
        assert_eq!(metadata.metas[1].refines.as_deref(), Some("creator"));
    }

    #[test]
    fn test_to_hash_covers_every_collection() {
        let mut metadata = Metadata::new();
        metadata.dc_identifiers.push(Identifier::new("urn:uuid:1234"));
        metadata.dc_creators.push(Dcmes::new("Lewis Carroll"));

        let hash = metadata.to_hash();
        assert_eq!(hash.len(), DcElement::ALL.len());
        assert_eq!(hash[&DcElement::Identifiers].contents(), vec!["urn:uuid:1234"]);
        assert_eq!(hash[&DcElement::Creators].contents(), vec!["Lewis Carroll"]);
        assert!(hash[&DcElement::Subjects].is_empty());
    }

    #[test]
    fn test_unique_identifier_element() {
        let mut metadata = Metadata::new();
        metadata.dc_identifiers.push(Identifier::new("isbn").with_id("isbn-id"));
        metadata.dc_identifiers.push(Identifier::new("urn:uuid:1").with_id("BookId"));
        metadata.unique_identifier = Some("BookId".to_string());

        assert_eq!(
            metadata.unique_identifier_element().map(|i| i.content.as_str()),
            Some("urn:uuid:1")
        );
    }
}
