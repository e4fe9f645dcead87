//! 精化（refines）关系模块
//!
//! EPUB3 中 `<meta refines="#id">` 为其它元数据元素补充信息（显示顺序、角色、排序名等）。
//! 每个可精化元素按插入顺序持有一组精化 meta，本模块提供基于固定词表的查找。

use crate::epub::opf::metadata::Meta;
use std::fmt;
use std::str::FromStr;

/// 精化词表中的术语
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RefinementTerm {
    AlternateScript,
    DisplaySeq,
    FileAs,
    GroupPosition,
    IdentifierType,
    MetaAuth,
    Role,
    TitleType,
}

impl RefinementTerm {
    /// 词表中的全部术语
    pub const ALL: [RefinementTerm; 8] = [
        RefinementTerm::AlternateScript,
        RefinementTerm::DisplaySeq,
        RefinementTerm::FileAs,
        RefinementTerm::GroupPosition,
        RefinementTerm::IdentifierType,
        RefinementTerm::MetaAuth,
        RefinementTerm::Role,
        RefinementTerm::TitleType,
    ];

    /// 术语在 `property` 属性中的写法
    pub fn as_str(&self) -> &'static str {
        match self {
            RefinementTerm::AlternateScript => "alternate-script",
            RefinementTerm::DisplaySeq => "display-seq",
            RefinementTerm::FileAs => "file-as",
            RefinementTerm::GroupPosition => "group-position",
            RefinementTerm::IdentifierType => "identifier-type",
            RefinementTerm::MetaAuth => "meta-auth",
            RefinementTerm::Role => "role",
            RefinementTerm::TitleType => "title-type",
        }
    }
}

impl fmt::Display for RefinementTerm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for RefinementTerm {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        RefinementTerm::ALL
            .iter()
            .copied()
            .find(|term| term.as_str() == s)
            .ok_or_else(|| format!("未知的精化术语: {}", s))
    }
}

/// 可被精化的元数据元素
///
/// 实现者只需提供对精化列表的访问，按术语的查找由默认方法完成。
/// 查找总是返回插入顺序中第一个匹配的精化 meta。
pub trait Refinable {
    /// 按插入顺序排列的精化 meta
    fn refiners(&self) -> &[Meta];

    /// 精化列表的可变引用
    fn refiners_mut(&mut self) -> &mut Vec<Meta>;

    /// 追加一个精化 meta
    fn add_refiner(&mut self, refiner: Meta) {
        self.refiners_mut().push(refiner);
    }

    /// 查找第一个 `property` 等于指定术语的精化 meta
    fn refiner(&self, term: RefinementTerm) -> Option<&Meta> {
        self.refiners()
            .iter()
            .find(|refiner| refiner.property == term.as_str())
    }

    fn alternate_script(&self) -> Option<&Meta> {
        self.refiner(RefinementTerm::AlternateScript)
    }

    fn display_seq(&self) -> Option<&Meta> {
        self.refiner(RefinementTerm::DisplaySeq)
    }

    fn file_as(&self) -> Option<&Meta> {
        self.refiner(RefinementTerm::FileAs)
    }

    fn group_position(&self) -> Option<&Meta> {
        self.refiner(RefinementTerm::GroupPosition)
    }

    fn identifier_type(&self) -> Option<&Meta> {
        self.refiner(RefinementTerm::IdentifierType)
    }

    fn meta_auth(&self) -> Option<&Meta> {
        self.refiner(RefinementTerm::MetaAuth)
    }

    fn role(&self) -> Option<&Meta> {
        self.refiner(RefinementTerm::Role)
    }

    fn title_type(&self) -> Option<&Meta> {
        self.refiner(RefinementTerm::TitleType)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::epub::opf::metadata::Dcmes;

    #[test]
    fn test_first_matching_refiner_wins() {
        let mut creator = Dcmes::new("Lewis Carroll");
        creator.add_refiner(Meta::refining("creator1", "role", "aut"));
        creator.add_refiner(Meta::refining("creator1", "file-as", "Carroll, Lewis"));
        creator.add_refiner(Meta::refining("creator1", "role", "ill"));

        assert_eq!(creator.role().map(|m| m.content.as_str()), Some("aut"));
        assert_eq!(
            creator.file_as().map(|m| m.content.as_str()),
            Some("Carroll, Lewis")
        );
        assert!(creator.display_seq().is_none());
        assert!(creator.meta_auth().is_none());
    }

    #[test]
    fn test_term_round_trip_through_str() {
        for term in RefinementTerm::ALL {
            assert_eq!(term.as_str().parse::<RefinementTerm>(), Ok(term));
        }
        assert!("display_seq".parse::<RefinementTerm>().is_err());
    }
}
