//! OPF解析器模块
//!
//! 把OPF包文档的XML内容填充进 [`Package`] 对象模型。

use crate::epub::error::{EpubError, Result};
use crate::epub::opf::config::MetadataTagConfigs;
use crate::epub::opf::manifest::Item;
use crate::epub::opf::metadata::{DcElement, Dcmes, Identifier, Link, Meta, Metadata, Title};
use crate::epub::opf::package::Package;
use crate::epub::opf::spine::Itemref;
use quick_xml::events::{BytesStart, Event};
use quick_xml::reader::Reader;
use std::collections::HashMap;
use tracing::{debug, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Section {
    None,
    Metadata,
    Manifest,
    Spine,
}

/// 等待文本内容的元数据元素
enum Pending {
    Meta(HashMap<String, String>),
    Element(DcElement, HashMap<String, String>),
}

impl Package {
    /// 使用默认标签配置解析OPF文件内容
    ///
    /// # 参数
    /// * `xml_content` - OPF文件的XML内容
    ///
    /// # 返回值
    /// * `Result<Package>` - 解析后的包文档
    pub fn parse_xml(xml_content: &str) -> Result<Package> {
        Self::parse_xml_with_config(xml_content, &MetadataTagConfigs::default_config())
    }

    /// 使用指定的标签配置解析OPF文件内容
    pub fn parse_xml_with_config(xml_content: &str, configs: &MetadataTagConfigs) -> Result<Package> {
        let mut reader = Reader::from_str(xml_content);
        reader.config_mut().trim_text(true);
        reader.config_mut().expand_empty_elements = true;

        let mut package = Package::new();
        let mut seen_package = false;
        let mut section = Section::None;
        let mut pending: Option<Pending> = None;
        let mut text_content = String::new();
        let mut buf = Vec::new();

        loop {
            match reader.read_event_into(&mut buf)? {
                Event::Start(ref e) => {
                    let local_name_bytes = e.local_name();
                    let local_name = String::from_utf8_lossy(local_name_bytes.as_ref()).into_owned();

                    match (section, local_name.as_str()) {
                        (_, "package") => {
                            seen_package = true;
                            Self::handle_package_start(e, &mut package)?;
                        }
                        (_, "metadata") => section = Section::Metadata,
                        (_, "manifest") => section = Section::Manifest,
                        (_, "spine") => {
                            section = Section::Spine;
                            let attributes = collect_attributes(e)?;
                            package.spine.toc = attributes.get("toc").cloned();
                            package.spine.page_progression_direction =
                                attributes.get("page-progression-direction").cloned();
                        }
                        (Section::Metadata, "meta") => {
                            pending = Some(Pending::Meta(collect_attributes(e)?));
                            text_content.clear();
                        }
                        (Section::Metadata, "link") => {
                            package.metadata.links.push(parse_link(e)?);
                        }
                        (Section::Metadata, name) => {
                            if let Some(element) = configs.collection_for(name) {
                                pending = Some(Pending::Element(element, collect_attributes(e)?));
                                text_content.clear();
                            }
                        }
                        (Section::Manifest, "item") => {
                            package.manifest.push(parse_manifest_item(e)?);
                        }
                        (Section::Spine, "itemref") => {
                            if let Some(itemref) = parse_itemref(e)? {
                                package.spine.push(itemref);
                            }
                        }
                        _ => {}
                    }
                }
                Event::End(ref e) => {
                    let local_name_bytes = e.local_name();
                    let local_name = String::from_utf8_lossy(local_name_bytes.as_ref());

                    match local_name.as_ref() {
                        "metadata" | "manifest" | "spine" => section = Section::None,
                        _ if section == Section::Metadata => {
                            if let Some(element) = pending.take() {
                                Self::finish_metadata_element(element, text_content.trim(), &mut package.metadata);
                            }
                            text_content.clear();
                        }
                        _ => {}
                    }
                }
                Event::Text(e) => {
                    if pending.is_some() {
                        text_content.push_str(&e.unescape()?);
                    }
                }
                Event::CData(e) => {
                    if pending.is_some() {
                        text_content.push_str(&String::from_utf8_lossy(&e.into_inner()));
                    }
                }
                Event::Eof => break,
                _ => {}
            }
            buf.clear();
        }

        if !seen_package {
            return Err(EpubError::OpfParseError("缺少package元素".to_string()));
        }

        attach_refiners(&mut package.metadata);

        debug!(
            version = %package.version,
            metas = package.metadata.metas.len(),
            items = package.manifest.len(),
            itemrefs = package.spine.len(),
            "OPF解析完成"
        );

        Ok(package)
    }

    /// 解析package元素的version、unique-identifier与prefix属性
    fn handle_package_start(e: &BytesStart, package: &mut Package) -> Result<()> {
        let attributes = collect_attributes(e)?;
        if let Some(version) = attributes.get("version") {
            package.version = version.clone();
        }
        package.metadata.unique_identifier = attributes.get("unique-identifier").cloned();
        if let Some(prefix) = attributes.get("prefix") {
            package.parse_prefix_attribute(prefix);
        }
        Ok(())
    }

    /// 元数据元素结束时，结合文本内容生成对应的对象
    fn finish_metadata_element(pending: Pending, content: &str, metadata: &mut Metadata) {
        match pending {
            Pending::Meta(mut attributes) => {
                if let Some(property) = attributes.remove("property") {
                    metadata.metas.push(Meta {
                        property,
                        content: content.to_string(),
                        refines: attributes
                            .remove("refines")
                            .map(|refines| refines.trim_start_matches('#').to_string()),
                        scheme: attributes.remove("scheme"),
                        id: attributes.remove("id"),
                        refiners: Vec::new(),
                    });
                } else if let Some(name) = attributes.remove("name") {
                    // EPUB2 的 <meta name="cover" content="cover-image"/>
                    let mut meta = Meta::new(name, attributes.remove("content").unwrap_or_default());
                    meta.scheme = attributes.remove("scheme");
                    meta.id = attributes.remove("id");
                    metadata.metas.push(meta);
                }
            }
            Pending::Element(element, mut attributes) => {
                if content.is_empty() {
                    return;
                }
                let id = attributes.remove("id");
                match element {
                    DcElement::Identifiers => metadata.dc_identifiers.push(Identifier {
                        content: content.to_string(),
                        id,
                        refiners: Vec::new(),
                    }),
                    DcElement::Titles => metadata.dc_titles.push(Title {
                        content: content.to_string(),
                        id,
                        lang: attributes.remove("lang"),
                        dir: attributes.remove("dir"),
                        refiners: Vec::new(),
                    }),
                    other => {
                        let dcmes = Dcmes {
                            content: content.to_string(),
                            id,
                            lang: attributes.remove("lang"),
                            dir: attributes.remove("dir"),
                            refiners: Vec::new(),
                        };
                        if let Some(collection) = metadata.dcmes_mut(other) {
                            collection.push(dcmes);
                        }
                    }
                }
            }
        }
    }
}

/// 收集元素的全部属性，键为不含命名空间前缀的本地名
fn collect_attributes(e: &BytesStart) -> Result<HashMap<String, String>> {
    let mut attributes = HashMap::new();
    for attr_result in e.attributes() {
        let attr = attr_result.map_err(|err| EpubError::XmlError(quick_xml::Error::InvalidAttr(err)))?;
        let key = String::from_utf8_lossy(attr.key.local_name().as_ref()).into_owned();
        let value = attr.unescape_value()?.into_owned();
        attributes.insert(key, value);
    }
    Ok(attributes)
}

fn split_properties(value: Option<&String>) -> Vec<String> {
    value
        .map(|v| v.split_whitespace().map(str::to_string).collect())
        .unwrap_or_default()
}

fn parse_link(e: &BytesStart) -> Result<Link> {
    let mut attributes = collect_attributes(e)?;
    Ok(Link {
        href: attributes.remove("href").unwrap_or_default(),
        rel: attributes.remove("rel"),
        id: attributes.remove("id"),
        refines: attributes
            .remove("refines")
            .map(|refines| refines.trim_start_matches('#').to_string()),
        media_type: attributes.remove("media-type"),
        iri: None,
        refiners: Vec::new(),
    })
}

/// 解析清单项
fn parse_manifest_item(e: &BytesStart) -> Result<Item> {
    let mut attributes = collect_attributes(e)?;
    let properties = split_properties(attributes.get("properties"));
    Ok(Item {
        id: attributes.remove("id").unwrap_or_default(),
        href: attributes.remove("href").unwrap_or_default(),
        media_type: attributes.remove("media-type").unwrap_or_default(),
        properties,
        fallback: attributes.remove("fallback"),
    })
}

/// 解析脊柱项，缺少idref时跳过
fn parse_itemref(e: &BytesStart) -> Result<Option<Itemref>> {
    let mut attributes = collect_attributes(e)?;
    let Some(idref) = attributes.remove("idref") else {
        warn!("itemref缺少idref属性，跳过");
        return Ok(None);
    };
    let linear = attributes.get("linear").is_none_or(|linear| linear != "no");
    let mut itemref = Itemref::with_linear(idref, linear)
        .with_properties(split_properties(attributes.get("properties")));
    itemref.id = attributes.remove("id");
    Ok(Some(itemref))
}

/// 把带 `refines` 的meta复制到被精化元素的精化列表中
///
/// 精化其它meta的条目按精化链深度由深到浅处理，使被复制的meta已带上整条链上的精化；
/// 之后再处理精化其它元素的条目。
fn attach_refiners(metadata: &mut Metadata) {
    let heights = refiner_heights(&metadata.metas);
    let is_meta_id = |metadata: &Metadata, target: &str| {
        metadata
            .metas
            .iter()
            .any(|meta| meta.id.as_deref() == Some(target))
    };

    let refinements: Vec<(usize, String)> = metadata
        .metas
        .iter()
        .enumerate()
        .filter_map(|(index, meta)| meta.refines.clone().map(|target| (index, target)))
        .collect();
    let (mut meta_targets, other_targets): (Vec<_>, Vec<_>) = refinements
        .into_iter()
        .partition(|(_, target)| is_meta_id(&*metadata, target.as_str()));
    meta_targets.sort_by_key(|&(index, _)| heights[index]);

    for (index, target) in meta_targets.into_iter().chain(other_targets) {
        let refiner = metadata.metas[index].clone();
        match metadata.refinable_mut(&target) {
            Some(element) => element.add_refiner(refiner),
            None => warn!(refines = %target, property = %refiner.property, "refines指向的元素不存在"),
        }
    }
}

/// 每个meta之下精化链的最大深度，没有被精化的meta为0
///
/// 出现循环精化时，回到链上已访问的meta按0计。
fn refiner_heights(metas: &[Meta]) -> Vec<usize> {
    fn height(metas: &[Meta], index: usize, memo: &mut [Option<usize>], visiting: &mut [bool]) -> usize {
        if let Some(known) = memo[index] {
            return known;
        }
        if visiting[index] {
            return 0;
        }
        visiting[index] = true;
        let own_id = metas[index].id.as_deref();
        let mut result = 0;
        if own_id.is_some() {
            for (child, meta) in metas.iter().enumerate() {
                if meta.refines.as_deref() == own_id {
                    result = result.max(height(metas, child, memo, visiting) + 1);
                }
            }
        }
        visiting[index] = false;
        memo[index] = Some(result);
        result
    }

    let mut memo = vec![None; metas.len()];
    let mut visiting = vec![false; metas.len()];
    (0..metas.len())
        .map(|index| height(metas, index, &mut memo, &mut visiting))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::epub::opf::package::PrefixHost;
    use crate::epub::opf::refinement::Refinable;
    use crate::epub::opf::rendition::Rendition;

    const FIXED_LAYOUT_OPF: &str = r##"<?xml version="1.0" encoding="UTF-8"?>
<package xmlns="http://www.idpf.org/2007/opf" version="3.0" unique-identifier="BookId"
         prefix="rendition: http://www.idpf.org/vocab/rendition/#">
  <metadata xmlns:dc="http://purl.org/dc/elements/1.1/">
    <dc:identifier id="BookId">urn:uuid:12345678-1234-1234-1234-123456789012</dc:identifier>
    <dc:title id="t1">A Dictionary of Modern English Usage</dc:title>
    <dc:title id="t2">First Edition</dc:title>
    <meta refines="#t1" property="title-type">main</meta>
    <meta refines="#t2" property="title-type">edition</meta>
    <dc:creator id="creator">Henry Watson Fowler</dc:creator>
    <meta refines="#creator" property="role" scheme="marc:relators" id="role">aut</meta>
    <meta refines="#role" property="alternate-script" xml:lang="fr">auteur</meta>
    <meta refines="#creator" property="file-as">Fowler, H. W.</meta>
    <dc:language>en</dc:language>
    <meta property="dcterms:modified">2024-05-01T00:00:00Z</meta>
    <meta property="rendition:layout">pre-paginated</meta>
    <meta property="rendition:spread">none</meta>
    <meta name="cover" content="cover-image"/>
    <link rel="record" href="meta/record.xml" media-type="application/marc"/>
  </metadata>
  <manifest>
    <item id="nav" href="nav.xhtml" media-type="application/xhtml+xml" properties="nav"/>
    <item id="cover-image" href="cover.jpg" media-type="image/jpeg" properties="cover-image"/>
    <item id="page1" href="page1.xhtml" media-type="application/xhtml+xml"/>
    <item id="page2" href="page2.xhtml" media-type="application/xhtml+xml" properties="svg"/>
  </manifest>
  <spine toc="ncx" page-progression-direction="ltr">
    <itemref idref="page1" properties="page-spread-left"/>
    <itemref idref="page2" linear="no" properties="rendition:layout-reflowable rendition:spread-both"/>
  </spine>
</package>"##;

    #[test]
    fn test_parse_package_attributes() {
        let package = Package::parse_xml(FIXED_LAYOUT_OPF).expect("解析OPF失败");

        assert_eq!(package.version, "3.0");
        assert!(package.using_fixed_layout());
        assert_eq!(package.unique_identifier(), Some("BookId"));
        assert_eq!(
            package.metadata.unique_identifier_element().map(|i| i.content.as_str()),
            Some("urn:uuid:12345678-1234-1234-1234-123456789012")
        );
    }

    #[test]
    fn test_parse_metadata_and_refiners() {
        let package = Package::parse_xml(FIXED_LAYOUT_OPF).expect("解析OPF失败");
        let metadata = &package.metadata;

        assert_eq!(metadata.title(), "A Dictionary of Modern English Usage");
        assert_eq!(metadata.edition_title(), "First Edition");

        let creator = &metadata.dc_creators[0];
        assert_eq!(creator.content, "Henry Watson Fowler");
        let role = creator.role().expect("缺少role精化");
        assert_eq!(role.content, "aut");
        assert_eq!(role.scheme.as_deref(), Some("marc:relators"));
        assert_eq!(
            role.alternate_script().map(|m| m.content.as_str()),
            Some("auteur")
        );
        assert_eq!(
            creator.file_as().map(|m| m.content.as_str()),
            Some("Fowler, H. W.")
        );

        let primary: Vec<&str> = metadata
            .primary_metas()
            .iter()
            .map(|m| m.property.as_str())
            .collect();
        assert_eq!(
            primary,
            vec!["dcterms:modified", "rendition:layout", "rendition:spread", "cover"]
        );
        assert_eq!(metadata.links[0].media_type.as_deref(), Some("application/marc"));
        assert_eq!(metadata.dc_languages[0].content, "en");
    }

    #[test]
    fn test_parse_rendition_properties() {
        let package = Package::parse_xml(FIXED_LAYOUT_OPF).expect("解析OPF失败");

        assert!(package.metadata.is_pre_paginated());
        assert!(package.metadata.is_spread_none());

        let first = package.itemref_rendition(0).unwrap();
        assert_eq!(first.layout(), "pre-paginated");
        assert_eq!(first.spread(), "none");

        let second = package.itemref_rendition(1).unwrap();
        assert!(!second.itemref().is_linear());
        assert!(second.is_reflowable());
        assert!(second.is_spread_both());
        assert_eq!(second.orientation(), "auto");
    }

    #[test]
    fn test_parse_manifest_and_spine() {
        let package = Package::parse_xml(FIXED_LAYOUT_OPF).expect("解析OPF失败");

        assert_eq!(package.manifest.len(), 4);
        assert_eq!(package.manifest.nav().map(|i| i.href.as_str()), Some("nav.xhtml"));
        assert_eq!(
            package.manifest.cover_image().map(|i| i.href.as_str()),
            Some("cover.jpg")
        );
        assert_eq!(package.spine.toc.as_deref(), Some("ncx"));
        assert_eq!(package.spine.len(), 2);

        let itemref = &package.spine.itemrefs()[1];
        assert_eq!(
            itemref.item(&package.manifest).map(|i| i.href.as_str()),
            Some("page2.xhtml")
        );
        assert_eq!(
            itemref.properties_attribute(),
            "rendition:layout-reflowable rendition:spread-both"
        );
    }

    #[test]
    fn test_custom_tag_config() {
        let xml = r#"<package version="2.0"><metadata><keyword>rust</keyword><subject>epub</subject></metadata></package>"#;
        let mut configs = MetadataTagConfigs::default_config();
        configs.subject.tags.push("keyword".to_string());

        let package = Package::parse_xml_with_config(xml, &configs).unwrap();
        let subjects: Vec<&str> = package
            .metadata
            .dc_subjects
            .iter()
            .map(|s| s.content.as_str())
            .collect();
        assert_eq!(subjects, vec!["rust", "epub"]);
        assert!(!package.using_fixed_layout());
    }

    #[test]
    fn test_refinement_chain_keeps_every_level() {
        let xml = r##"<package version="3.0"><metadata xmlns:dc="http://purl.org/dc/elements/1.1/">
    <dc:creator id="c">Natsume Soseki</dc:creator>
    <meta refines="#c" property="role" scheme="marc:relators" id="r">aut</meta>
    <meta refines="#r" property="alternate-script" id="a">著者</meta>
    <meta refines="#a" property="file-as" id="f">zz</meta>
    <meta refines="#f" property="display-seq">1</meta>
  </metadata></package>"##;
        let package = Package::parse_xml(xml).unwrap();
        let metadata = &package.metadata;

        let alternate = metadata.metas.iter().find(|m| m.id.as_deref() == Some("a")).unwrap();
        assert_eq!(alternate.file_as().map(|m| m.content.as_str()), Some("zz"));

        let role = metadata.dc_creators[0].role().unwrap();
        let script = role.alternate_script().unwrap();
        assert_eq!(script.content, "著者");
        let file_as = script.file_as().unwrap();
        assert_eq!(file_as.content, "zz");
        assert_eq!(file_as.display_seq().map(|m| m.content.as_str()), Some("1"));
    }

    #[test]
    fn test_cyclic_refinement_does_not_hang() {
        let xml = r##"<package version="3.0"><metadata>
    <meta refines="#y" property="role" id="x">a</meta>
    <meta refines="#x" property="role" id="y">b</meta>
  </metadata></package>"##;
        let package = Package::parse_xml(xml).unwrap();
        assert_eq!(package.metadata.metas.len(), 2);
        assert!(package.metadata.metas.iter().all(|m| m.role().is_some()));
    }

    #[test]
    fn test_missing_package_element() {
        let err = Package::parse_xml("<metadata/>").unwrap_err();
        assert!(matches!(err, EpubError::OpfParseError(_)));
    }
}
