use super::api_item::{ApiItem, ApiModifiers, ApiPackage, DocInfo, ReleaseInfo};
use crate::collector::{Collector, InternalError, ReleaseTag};
use crate::excerpt::{Excerpt, ExcerptBuilder, ExcerptCapture, ExcerptToken, ExcerptTokenKind};
use crate::front_end::{
    DeclarationId, DeclarationInfo, DeclarationKind, Entity, NamespaceImportId, SymbolId,
    SyntaxRole,
};
use std::collections::HashSet;
use tracing::{debug, instrument};

/// Turns an analyzed [`Collector`] into the serializable API model.
pub struct ModelBuilder<'c, 'a> {
    collector: &'c mut Collector<'a>,
    /// Namespace imports currently being expanded, to stop alias cycles.
    expanding: HashSet<NamespaceImportId>,
}

impl<'c, 'a> ModelBuilder<'c, 'a> {
    pub fn new(collector: &'c mut Collector<'a>) -> Self {
        Self {
            collector,
            expanding: HashSet::new(),
        }
    }

    #[instrument(skip_all)]
    pub fn build(&mut self) -> Result<ApiPackage, InternalError> {
        let front_end = self.collector.front_end();
        let package_name = front_end.package_name().to_string();
        let include_forgotten = self.collector.config().include_forgotten_exports;

        let roots: Vec<(Entity, String)> = self
            .collector
            .entities()
            .filter(|entity| entity.is_exported() || include_forgotten)
            .filter_map(|entity| {
                let name = entity.name_for_emit()?.to_string();
                Some((entity.entity(), name))
            })
            .collect();

        let prefix = format!("{}!", package_name);
        let mut members = Vec::new();
        for (entity, name) in roots {
            members.extend(self.entity_items(entity, &name, &prefix)?);
        }
        debug!(items = members.len(), "built API model");

        Ok(ApiPackage {
            canonical_reference: format!("{}!", package_name),
            name: package_name,
            members,
        })
    }

    fn entity_items(
        &mut self,
        entity: Entity,
        name: &str,
        prefix: &str,
    ) -> Result<Vec<ApiItem>, InternalError> {
        match entity {
            Entity::Symbol(symbol) => {
                if self.collector.front_end().symbol(symbol).is_external() {
                    return Ok(Vec::new());
                }
                self.symbol_items(symbol, name, prefix, None)
            }
            Entity::NamespaceImport(id) => Ok(self.namespace_item(id, name, prefix)?.into_iter().collect()),
        }
    }

    /// One item per non-ancillary declaration of `symbol`. When `within` is
    /// set, only declarations nested in that parent declaration are used.
    fn symbol_items(
        &mut self,
        symbol: SymbolId,
        name: &str,
        prefix: &str,
        within: Option<&[DeclarationId]>,
    ) -> Result<Vec<ApiItem>, InternalError> {
        let declarations = self.collector.non_ancillary_declarations(symbol)?;
        let mut items = Vec::new();
        for declaration in declarations {
            if within.is_some_and(|siblings| !siblings.contains(&declaration)) {
                continue;
            }
            items.push(self.declaration_item(declaration, name, prefix)?);
        }
        Ok(items)
    }

    fn declaration_item(
        &mut self,
        declaration: DeclarationId,
        name: &str,
        prefix: &str,
    ) -> Result<ApiItem, InternalError> {
        let front_end = self.collector.front_end();
        let info = front_end.declaration(declaration);
        let kind = info.kind;

        let metadata = self.collector.fetch_api_item_metadata(declaration)?;
        let ancillary = self
            .collector
            .fetch_declaration_metadata(declaration)?
            .ancillary_declarations
            .clone();
        let overload_index = has_overloads(kind).then(|| self.collector.overload_index(declaration));

        let base = format!("{}{}", prefix, name);
        let canonical_reference = match overload_index {
            Some(index) => format!("{}:{}({})", base, kind, index),
            None => format!("{}:{}", base, kind),
        };

        let captures = captures_for(info);
        let mut parts: Vec<(DeclarationId, &[ExcerptCapture])> = vec![(declaration, &captures)];
        parts.extend(ancillary.iter().map(|&other| (other, &[][..])));
        let excerpt = ExcerptBuilder::new(front_end, &*self.collector).build_item_excerpt(&parts);

        let modifiers = ApiModifiers {
            is_static: info.modifiers.is_static,
            is_protected: info.modifiers.protected,
            is_readonly: info.modifiers.readonly,
            is_abstract: info.modifiers.is_abstract,
            is_optional: info.modifiers.optional,
            is_override: metadata.is_override,
            is_sealed: metadata.is_sealed,
            is_virtual: metadata.is_virtual,
            is_event_property: metadata.is_event_property,
        };
        let release = ReleaseInfo {
            release_tag: metadata.effective_release_tag,
            release_tag_same_as_parent: metadata.release_tag_same_as_parent,
            is_preapproved: metadata.is_preapproved,
        };
        let docs = DocInfo {
            doc_comment: metadata.doc_comment.clone(),
        };

        let members = self.member_items(info, &base)?;

        Ok(ApiItem {
            kind,
            name: name.to_string(),
            canonical_reference,
            overload_index,
            release,
            docs,
            modifiers,
            excerpt,
            members,
        })
    }

    fn member_items(
        &mut self,
        info: &DeclarationInfo,
        base: &str,
    ) -> Result<Vec<ApiItem>, InternalError> {
        let front_end = self.collector.front_end();
        let mut seen = HashSet::new();
        let mut members = Vec::new();
        for &child in &info.children {
            let symbol = front_end.declaration(child).symbol;
            if !seen.insert(symbol) {
                continue;
            }
            let child_info = front_end.declaration(child);
            // Instance members use `#`, static and namespace members use `.`.
            let separator = if info.kind == DeclarationKind::Namespace
                || info.kind == DeclarationKind::Enum
                || child_info.modifiers.is_static
            {
                '.'
            } else {
                '#'
            };
            let prefix = format!("{}{}", base, separator);
            let name = front_end.symbol(symbol).name.clone();
            members.extend(self.symbol_items(symbol, &name, &prefix, Some(info.children.as_slice()))?);
        }
        Ok(members)
    }

    /// A namespace item listing every export of the imported module. Members
    /// reachable through several aliases appear under each of them.
    fn namespace_item(
        &mut self,
        id: NamespaceImportId,
        name: &str,
        prefix: &str,
    ) -> Result<Option<ApiItem>, InternalError> {
        if !self.expanding.insert(id) {
            return Ok(None);
        }
        let front_end = self.collector.front_end();
        let module = front_end.namespace_import(id).module;
        let base = format!("{}{}", prefix, name);
        let member_prefix = format!("{}.", base);

        let mut members = Vec::new();
        for (export_name, member) in front_end.export_table(module) {
            let member = match *member {
                Entity::Symbol(symbol) => Entity::Symbol(front_end.root_symbol(symbol)),
                other => other,
            };
            members.extend(self.entity_items(member, export_name, &member_prefix)?);
        }
        self.expanding.remove(&id);

        let text = format!("declare namespace {} ", name);
        Ok(Some(ApiItem {
            kind: DeclarationKind::Namespace,
            name: name.to_string(),
            canonical_reference: format!("{}:namespace", base),
            overload_index: None,
            release: ReleaseInfo {
                release_tag: ReleaseTag::Public,
                ..ReleaseInfo::default()
            },
            docs: DocInfo::default(),
            modifiers: ApiModifiers::default(),
            excerpt: Excerpt {
                tokens: vec![ExcerptToken {
                    kind: ExcerptTokenKind::Content,
                    text,
                    canonical_reference: None,
                }],
                ranges: Vec::new(),
            },
            members,
        }))
    }
}

fn has_overloads(kind: DeclarationKind) -> bool {
    matches!(
        kind,
        DeclarationKind::Function
            | DeclarationKind::Method
            | DeclarationKind::Constructor
            | DeclarationKind::CallSignature
            | DeclarationKind::ConstructSignature
            | DeclarationKind::IndexSignature
    )
}

/// Named ranges recorded in each kind's excerpt.
fn captures_for(info: &DeclarationInfo) -> Vec<ExcerptCapture> {
    let mut captures = Vec::new();

    for index in 0..info.type_parameters.len() {
        captures.push(ExcerptCapture::new(
            format!("typeParameters[{}].constraint", index),
            SyntaxRole::TypeParameterConstraint(index),
        ));
        captures.push(ExcerptCapture::new(
            format!("typeParameters[{}].default", index),
            SyntaxRole::TypeParameterDefault(index),
        ));
    }

    match info.kind {
        DeclarationKind::Class => {
            captures.push(ExcerptCapture::new("extendsTokenRange", SyntaxRole::Extends));
            for span in &info.spans {
                if let SyntaxRole::Implements(index) = span.role {
                    captures.push(ExcerptCapture::new(
                        format!("implementsTokenRanges[{}]", index),
                        span.role,
                    ));
                }
            }
        }
        DeclarationKind::Interface => {
            for span in &info.spans {
                if let SyntaxRole::ExtendsType(index) = span.role {
                    captures.push(ExcerptCapture::new(
                        format!("extendsTokenRanges[{}]", index),
                        span.role,
                    ));
                }
            }
        }
        DeclarationKind::Function
        | DeclarationKind::Method
        | DeclarationKind::Constructor
        | DeclarationKind::CallSignature
        | DeclarationKind::ConstructSignature => {
            captures.push(ExcerptCapture::new("returnTypeTokenRange", SyntaxRole::ReturnType));
            for index in 0..info.parameters.len() {
                captures.push(ExcerptCapture::new(
                    format!("parameters[{}]", index),
                    SyntaxRole::ParameterType(index),
                ));
            }
        }
        DeclarationKind::IndexSignature => {
            captures.push(ExcerptCapture::new("returnTypeTokenRange", SyntaxRole::Type));
        }
        DeclarationKind::GetAccessor => {
            captures.push(ExcerptCapture::new("propertyTypeTokenRange", SyntaxRole::ReturnType));
        }
        DeclarationKind::Property => {
            captures.push(ExcerptCapture::new("propertyTypeTokenRange", SyntaxRole::Type));
        }
        DeclarationKind::TypeAlias => {
            captures.push(ExcerptCapture::new("typeTokenRange", SyntaxRole::Type));
        }
        DeclarationKind::Variable => {
            captures.push(ExcerptCapture::new("variableTypeTokenRange", SyntaxRole::Type));
        }
        DeclarationKind::SetAccessor
        | DeclarationKind::Enum
        | DeclarationKind::EnumMember
        | DeclarationKind::Namespace => {}
    }

    captures
}
