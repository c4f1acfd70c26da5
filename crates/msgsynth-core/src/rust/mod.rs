//! Extracts message interfaces from annotated Rust trait declarations.
//!
//! ```ignore
//! #[message_bundle(project_code = "EX", package = "com.acme")]
//! pub trait Messages {
//!     #[message(id = 7, text = "bad field {0}")]
//!     fn bad_field(&self, field: String) -> IllegalArgumentException;
//! }
//! ```

use std::collections::{BTreeMap, BTreeSet};
use std::path::Path;

use anyhow::Result;
use syn::punctuated::Punctuated;
use syn::Token;

use crate::config::{ExceptionCatalog, GenerationConfig};
use crate::diagnostics::{Diagnostic, DiagnosticCode};
use crate::model::{
    ConstructionParam, ConstructorShape, FormatKind, MessageDescriptor, MessageInterface,
    MethodDescriptor, ParamRole, ParameterDescriptor, ReturnDescriptor, ThrowableReturnDescriptor,
    TypeRef,
};

pub fn import_rust_file(
    src_path: &Path,
    src: &str,
    config: &GenerationConfig,
) -> Result<Vec<MessageInterface>> {
    let mut interfaces = import_rust_source(src, config)?;
    let sha = crate::util::sha256_hex(src.as_bytes());
    for i in &mut interfaces {
        i.source_path = Some(src_path.to_string_lossy().to_string());
        i.source_sha256 = Some(sha.clone());
    }
    Ok(interfaces)
}

pub fn import_rust_source(src: &str, config: &GenerationConfig) -> Result<Vec<MessageInterface>> {
    let file: syn::File = syn::parse_file(src).map_err(|e| {
        anyhow::Error::new(Diagnostic::error(DiagnosticCode::MSG0001ParseError, e.to_string()))
            .context("msgsynth parse failed")
    })?;

    let mut catalog = config.catalog();
    let mut traits: BTreeMap<String, &syn::ItemTrait> = BTreeMap::new();
    let mut bundles: Vec<&syn::ItemTrait> = Vec::new();
    for item in &file.items {
        match item {
            syn::Item::Struct(s) => register_exception(&mut catalog, &s.ident, &s.attrs)?,
            syn::Item::Enum(e) => register_exception(&mut catalog, &e.ident, &e.attrs)?,
            syn::Item::Trait(t) => {
                traits.insert(t.ident.to_string(), t);
                if find_attr(&t.attrs, "message_bundle").is_some() {
                    bundles.push(t);
                }
            }
            _ => {}
        }
    }

    let cx = Ctx {
        traits: &traits,
        catalog: &catalog,
        default_format: config.default_format,
    };
    let mut out = Vec::with_capacity(bundles.len());
    for t in bundles {
        out.push(cx.lower_bundle(t)?);
    }
    Ok(out)
}

struct Ctx<'a> {
    traits: &'a BTreeMap<String, &'a syn::ItemTrait>,
    catalog: &'a ExceptionCatalog,
    default_format: FormatKind,
}

#[derive(Debug, Default)]
struct BundleAttr {
    project_code: Option<String>,
    package: Option<String>,
    format: Option<FormatKind>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum IdSpec {
    Absent,
    Explicit(u32),
    Inherit,
}

#[derive(Debug)]
struct MessageAttr {
    text: Option<String>,
    id: IdSpec,
    format: Option<FormatKind>,
}

impl<'a> Ctx<'a> {
    fn lower_bundle(&self, t: &syn::ItemTrait) -> Result<MessageInterface> {
        let name = t.ident.to_string();
        let bundle = match find_attr(&t.attrs, "message_bundle") {
            Some(attr) => parse_bundle_attr(attr).map_err(|e| invalid_attr(&name, e))?,
            None => BundleAttr::default(),
        };

        let mut declared: Vec<(&syn::ItemTrait, &syn::TraitItemFn)> = Vec::new();
        self.collect_methods(t, &mut BTreeSet::new(), &mut declared)?;

        // Overriding declarations replace the inherited one in place.
        let mut methods: Vec<MethodDescriptor> = Vec::new();
        for (owner, f) in declared {
            let format = self
                .trait_format(owner)?
                .or(bundle.format)
                .unwrap_or(self.default_format);
            let m = self
                .lower_method(owner, f, format)
                .map_err(|e| at_subject(e, &format!("{}.{}", owner.ident, f.sig.ident)))?;
            match methods.iter_mut().find(|x| same_signature(x, &m)) {
                Some(existing) => *existing = m,
                None => methods.push(m),
            }
        }

        Ok(MessageInterface {
            name,
            package: bundle.package,
            project_code: bundle.project_code,
            methods,
            source_path: None,
            source_sha256: None,
        })
    }

    /// Supertraits first (depth-first, declaration order), then the trait's own methods.
    fn collect_methods<'t>(
        &'t self,
        t: &'t syn::ItemTrait,
        visited: &mut BTreeSet<String>,
        out: &mut Vec<(&'t syn::ItemTrait, &'t syn::TraitItemFn)>,
    ) -> Result<()> {
        if !visited.insert(t.ident.to_string()) {
            return Ok(());
        }
        for parent in self.local_supertraits(t) {
            self.collect_methods(parent, visited, out)?;
        }
        for item in &t.items {
            match item {
                syn::TraitItem::Fn(f) => out.push((t, f)),
                _ => {
                    return Err(Diagnostic::error(
                        DiagnosticCode::MSG0110UnsupportedMethodSig,
                        "only methods are supported inside message traits",
                    )
                    .at(t.ident.to_string())
                    .into())
                }
            }
        }
        Ok(())
    }

    fn local_supertraits(&self, t: &syn::ItemTrait) -> Vec<&'a syn::ItemTrait> {
        t.supertraits
            .iter()
            .filter_map(|bound| match bound {
                syn::TypeParamBound::Trait(tb) => tb.path.segments.last(),
                _ => None,
            })
            .filter_map(|seg| self.traits.get(&seg.ident.to_string()).copied())
            .collect()
    }

    fn trait_format(&self, t: &syn::ItemTrait) -> Result<Option<FormatKind>> {
        match find_attr(&t.attrs, "message_bundle") {
            Some(attr) => Ok(parse_bundle_attr(attr)
                .map_err(|e| invalid_attr(&t.ident.to_string(), e))?
                .format),
            None => Ok(None),
        }
    }

    fn lower_method(
        &self,
        owner: &syn::ItemTrait,
        f: &syn::TraitItemFn,
        default_format: FormatKind,
    ) -> Result<MethodDescriptor> {
        let sig = &f.sig;
        let name = sig.ident.to_string();
        if !sig.generics.params.is_empty() {
            return Err(unsupported_sig("generic message methods are not supported"));
        }
        if f.default.is_some() {
            return Err(unsupported_sig("message methods must not have a default body"));
        }
        if sig.asyncness.is_some() || sig.unsafety.is_some() || sig.abi.is_some() {
            return Err(unsupported_sig("async/unsafe/extern are not supported"));
        }

        let Some(attr) = find_attr(&f.attrs, "message") else {
            return Err(Diagnostic::error(
                DiagnosticCode::MSG0200MissingMessage,
                format!("method {name} has no #[message] attribute"),
            )
            .into());
        };
        let msg = parse_message_attr(attr).map_err(|e| invalid_attr(&name, e))?;
        let Some(text) = msg.text else {
            return Err(Diagnostic::error(
                DiagnosticCode::MSG0201InvalidAttribute,
                "#[message] requires `text = \"...\"`",
            )
            .into());
        };
        let id = match msg.id {
            IdSpec::Absent => None,
            IdSpec::Explicit(id) => Some(id),
            IdSpec::Inherit => Some(
                self.inherited_id(owner, &name, &mut BTreeSet::new())?
                    .ok_or_else(|| {
                        Diagnostic::error(
                            DiagnosticCode::MSG0203InheritedIdNotFound,
                            format!("no supertrait of {} declares an id for {name}", owner.ident),
                        )
                    })?,
            ),
        };

        let mut params = Vec::new();
        let mut saw_receiver = false;
        for input in &sig.inputs {
            match input {
                syn::FnArg::Receiver(r) => {
                    if r.reference.is_none() || r.mutability.is_some() {
                        return Err(unsupported_sig("message methods take `&self`"));
                    }
                    saw_receiver = true;
                }
                syn::FnArg::Typed(pat_ty) => params.push(lower_param(pat_ty)?),
            }
        }
        if !saw_receiver {
            return Err(unsupported_sig("message methods take `&self`"));
        }
        if params.iter().filter(|p| p.role == ParamRole::Cause).count() > 1 {
            return Err(Diagnostic::error(
                DiagnosticCode::MSG0202MultipleCauses,
                "at most one parameter may be marked #[cause]",
            )
            .into());
        }

        let return_type = match &sig.output {
            syn::ReturnType::Default => {
                return Err(unsupported_sig("message methods must return a value"))
            }
            syn::ReturnType::Type(_, ty) => self.lower_return(ty)?,
        };

        let mut thrown = Vec::new();
        for attr in f.attrs.iter().filter(|a| a.path().is_ident("throws")) {
            let paths = attr
                .parse_args_with(Punctuated::<syn::Path, Token![,]>::parse_terminated)
                .map_err(|e| invalid_attr(&name, e))?;
            thrown.extend(paths.iter().map(|p| TypeRef::new(dotted(p))));
        }

        Ok(MethodDescriptor {
            name,
            params,
            return_type,
            message: MessageDescriptor {
                text,
                id,
                inherits_id: msg.id == IdSpec::Inherit,
                format: msg.format.unwrap_or(default_format),
            },
            thrown,
        })
    }

    fn inherited_id(
        &self,
        t: &syn::ItemTrait,
        method: &str,
        visited: &mut BTreeSet<String>,
    ) -> Result<Option<u32>> {
        if !visited.insert(t.ident.to_string()) {
            return Ok(None);
        }
        for parent in self.local_supertraits(t) {
            let declared = parent.items.iter().find_map(|item| match item {
                syn::TraitItem::Fn(f) if f.sig.ident == method => Some(f),
                _ => None,
            });
            let spec = match declared.and_then(|f| find_attr(&f.attrs, "message")) {
                Some(attr) => Some(
                    parse_message_attr(attr)
                        .map_err(|e| invalid_attr(&format!("{}.{method}", parent.ident), e))?
                        .id,
                ),
                None => None,
            };
            if let Some(IdSpec::Explicit(id)) = spec {
                return Ok(Some(id));
            }
            if let Some(id) = self.inherited_id(parent, method, visited)? {
                return Ok(Some(id));
            }
        }
        Ok(None)
    }

    fn lower_return(&self, ty: &syn::Type) -> Result<ReturnDescriptor> {
        let ty = lower_ty(ty)?;
        if ty.is_string() {
            return Ok(ReturnDescriptor::value(ty.as_str()));
        }
        match self.catalog.resolve(ty.as_str()) {
            Some((resolved, desc)) => Ok(ReturnDescriptor::throwable(
                resolved.as_str(),
                desc.clone(),
            )),
            None => Err(Diagnostic::error(
                DiagnosticCode::MSG0300UnresolvedReturnType,
                format!("unknown exception type: {ty}"),
            )
            .into()),
        }
    }
}

fn same_signature(a: &MethodDescriptor, b: &MethodDescriptor) -> bool {
    a.name == b.name
        && a.params.len() == b.params.len()
        && a.params.iter().zip(&b.params).all(|(x, y)| x.ty == y.ty)
}

fn lower_param(pat_ty: &syn::PatType) -> Result<ParameterDescriptor> {
    let syn::Pat::Ident(pat_ident) = &*pat_ty.pat else {
        return Err(Diagnostic::error(
            DiagnosticCode::MSG0111UnsupportedParamPattern,
            "only ident parameters are supported",
        )
        .into());
    };
    let name = pat_ident.ident.to_string();
    let ty = lower_ty(&pat_ty.ty)?;

    let mut role: Option<ParamRole> = None;
    let mut formatter = None;
    for attr in &pat_ty.attrs {
        let next = if attr.path().is_ident("cause") {
            ParamRole::Cause
        } else if attr.path().is_ident("param") {
            ParamRole::MessageBound
        } else if attr.path().is_ident("field") {
            ParamRole::FieldTarget {
                name: parse_target_name(attr).map_err(|e| invalid_attr(&name, e))?,
            }
        } else if attr.path().is_ident("property") {
            ParamRole::PropertyTarget {
                name: parse_target_name(attr).map_err(|e| invalid_attr(&name, e))?,
            }
        } else if attr.path().is_ident("format_with") {
            let path: syn::Path = attr.parse_args().map_err(|e| invalid_attr(&name, e))?;
            formatter = Some(TypeRef::new(dotted(&path)));
            continue;
        } else {
            continue;
        };
        if role.replace(next).is_some() {
            return Err(Diagnostic::error(
                DiagnosticCode::MSG0201InvalidAttribute,
                format!("parameter {name} has more than one role attribute"),
            )
            .into());
        }
    }

    Ok(ParameterDescriptor {
        name,
        ty,
        role: role.unwrap_or(ParamRole::FormatArgument),
        formatter,
    })
}

fn lower_ty(ty: &syn::Type) -> Result<TypeRef> {
    match ty {
        syn::Type::Reference(r) => {
            if r.mutability.is_some() {
                return Err(unsupported_ty("mutable references are not supported"));
            }
            lower_ty(&r.elem)
        }
        syn::Type::Paren(p) => lower_ty(&p.elem),
        syn::Type::Group(g) => lower_ty(&g.elem),
        syn::Type::Path(p) => {
            if p.qself.is_some() {
                return Err(unsupported_ty("qualified self types are not supported"));
            }
            if p.path.segments.iter().any(|s| !s.arguments.is_none()) {
                return Err(unsupported_ty("generic types are not supported"));
            }
            if let Some(ident) = p.path.get_ident() {
                let java = match ident.to_string().as_str() {
                    "str" | "String" => "String",
                    "bool" => "boolean",
                    "i8" => "byte",
                    "i16" => "short",
                    "i32" => "int",
                    "i64" => "long",
                    "f32" => "float",
                    "f64" => "double",
                    "char" => "char",
                    _ => return Ok(TypeRef::new(ident.to_string())),
                };
                return Ok(TypeRef::new(java));
            }
            Ok(TypeRef::new(dotted(&p.path)))
        }
        _ => Err(unsupported_ty("unsupported type expression")),
    }
}

fn register_exception(
    catalog: &mut ExceptionCatalog,
    ident: &syn::Ident,
    attrs: &[syn::Attribute],
) -> Result<()> {
    let mut name = ident.to_string();
    let mut desc = ThrowableReturnDescriptor::default();
    let mut seen = false;
    for attr in attrs.iter().filter(|a| a.path().is_ident("exception")) {
        seen = true;
        let mut duplicate = false;
        attr.parse_nested_meta(|meta| {
            if meta.path.is_ident("name") {
                let s: syn::LitStr = meta.value()?.parse()?;
                name = s.value();
            } else if meta.path.is_ident("constructors") {
                meta.parse_nested_meta(|inner| {
                    let shape = inner
                        .path
                        .get_ident()
                        .and_then(|i| ConstructorShape::parse(&i.to_string()))
                        .ok_or_else(|| inner.error("unknown constructor shape"))?;
                    desc.constructors.insert(shape);
                    Ok(())
                })?;
            } else if meta.path.is_ident("construct") {
                let mut slots = Vec::new();
                meta.parse_nested_meta(|inner| {
                    let slot = inner
                        .path
                        .get_ident()
                        .ok_or_else(|| inner.error("expected a slot name"))?
                        .to_string();
                    if inner.input.peek(Token![=]) {
                        let bound: syn::Ident = inner.value()?.parse()?;
                        if bound != "message" {
                            return Err(inner.error("only `<slot> = message` is supported"));
                        }
                        slots.push(ConstructionParam::message(slot));
                    } else {
                        slots.push(ConstructionParam::param(slot));
                    }
                    Ok(())
                })?;
                if desc.construction_params.replace(slots).is_some() {
                    duplicate = true;
                }
            } else {
                return Err(meta.error("unsupported exception key"));
            }
            Ok(())
        })
        .map_err(|e| invalid_attr(&ident.to_string(), e))?;
        if duplicate {
            return Err(Diagnostic::error(
                DiagnosticCode::MSG0301DuplicateConstructionParams,
                format!("{ident} declares `construct(...)` more than once"),
            )
            .into());
        }
    }
    if seen {
        catalog.insert(TypeRef::new(name), desc);
    }
    Ok(())
}

fn parse_bundle_attr(attr: &syn::Attribute) -> syn::Result<BundleAttr> {
    let mut out = BundleAttr::default();
    if matches!(attr.meta, syn::Meta::Path(_)) {
        return Ok(out);
    }
    attr.parse_nested_meta(|meta| {
        let value: syn::LitStr = meta.value()?.parse()?;
        if meta.path.is_ident("project_code") {
            out.project_code = Some(value.value());
        } else if meta.path.is_ident("package") {
            out.package = Some(value.value());
        } else if meta.path.is_ident("format") {
            out.format = Some(
                FormatKind::parse(&value.value()).ok_or_else(|| meta.error("unknown format"))?,
            );
        } else {
            return Err(meta.error("unsupported message_bundle key"));
        }
        Ok(())
    })?;
    Ok(out)
}

fn parse_message_attr(attr: &syn::Attribute) -> syn::Result<MessageAttr> {
    let mut out = MessageAttr {
        text: None,
        id: IdSpec::Absent,
        format: None,
    };
    attr.parse_nested_meta(|meta| {
        if meta.path.is_ident("id") {
            let value: syn::Expr = meta.value()?.parse()?;
            out.id = match value {
                syn::Expr::Lit(syn::ExprLit {
                    lit: syn::Lit::Int(i),
                    ..
                }) => IdSpec::Explicit(i.base10_parse()?),
                syn::Expr::Path(p) if p.path.is_ident("inherit") => IdSpec::Inherit,
                _ => return Err(meta.error("id must be an integer or `inherit`")),
            };
        } else if meta.path.is_ident("text") {
            let s: syn::LitStr = meta.value()?.parse()?;
            out.text = Some(s.value());
        } else if meta.path.is_ident("format") {
            let s: syn::LitStr = meta.value()?.parse()?;
            out.format =
                Some(FormatKind::parse(&s.value()).ok_or_else(|| meta.error("unknown format"))?);
        } else {
            return Err(meta.error("unsupported message key"));
        }
        Ok(())
    })?;
    Ok(out)
}

fn parse_target_name(attr: &syn::Attribute) -> syn::Result<Option<String>> {
    if matches!(attr.meta, syn::Meta::Path(_)) {
        return Ok(None);
    }
    let mut name = None;
    attr.parse_nested_meta(|meta| {
        if meta.path.is_ident("name") {
            let s: syn::LitStr = meta.value()?.parse()?;
            name = Some(s.value());
            Ok(())
        } else {
            Err(meta.error("expected `name = \"...\"`"))
        }
    })?;
    Ok(name)
}

fn find_attr<'a>(attrs: &'a [syn::Attribute], name: &str) -> Option<&'a syn::Attribute> {
    attrs.iter().find(|a| a.path().is_ident(name))
}

fn dotted(path: &syn::Path) -> String {
    path.segments
        .iter()
        .map(|s| s.ident.to_string())
        .collect::<Vec<_>>()
        .join(".")
}

fn invalid_attr(subject: &str, e: syn::Error) -> anyhow::Error {
    Diagnostic::error(DiagnosticCode::MSG0201InvalidAttribute, e.to_string())
        .at(subject)
        .into()
}

fn unsupported_sig(msg: &str) -> anyhow::Error {
    Diagnostic::error(DiagnosticCode::MSG0110UnsupportedMethodSig, msg).into()
}

fn unsupported_ty(msg: &str) -> anyhow::Error {
    Diagnostic::error(DiagnosticCode::MSG0120UnsupportedType, msg).into()
}

fn at_subject(err: anyhow::Error, subject: &str) -> anyhow::Error {
    match err.downcast::<Diagnostic>() {
        Ok(d) if d.subject.is_none() => d.at(subject).into(),
        Ok(d) => d.into(),
        Err(err) => err,
    }
}
