//! Registration-time binding schemas.
//!
//! A record type describes its fields once through a [`SchemaBuilder`]; the
//! resulting [`RecordSchema`] is stored with the handler and applied to a fresh
//! `Default` record on every request. Nested records are flattened into the
//! parent's rule list through composed field projections, so binding never
//! inspects types at request time.
//!
//! A record may also opt into a JSON overlay ([`SchemaBuilder::json`]): when
//! the request carries a JSON content type, the decoded body is merged over
//! the bound record as the last step.

use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use std::sync::Arc;
use tracing::{trace, warn};

use super::caster::{Caster, CasterTable, Scalar, ScalarKind, ScalarValue, Timestamp};
use super::names::resolve_keys;
use super::sources::Sources;
use crate::dispatcher::RequestContext;

/// Where a field's value comes from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Source {
    /// Path variables, then query and form values
    Form,
    Cookie,
    Header,
    Session,
    /// The live request context itself
    Context,
}

/// Shape of a bound field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "shape", content = "kind", rename_all = "lowercase")]
pub enum FieldKind {
    Scalar(ScalarKind),
    Sequence(ScalarKind),
    Context,
}

/// Introspectable binding rule of one (flattened) field.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FieldInfo {
    /// Declared field name
    pub name: String,
    pub source: Source,
    /// Candidate keys in lookup order
    pub keys: Vec<String>,
    pub kind: FieldKind,
}

/// Declaration of a field as written on the record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldSpec {
    pub name: String,
    pub source: Source,
    /// Explicit key; `None` or `"~"` means conventional keys
    pub key: Option<String>,
}

impl FieldSpec {
    #[must_use]
    pub fn new(name: &str, source: Source, key: Option<&str>) -> Self {
        Self {
            name: name.to_string(),
            source,
            key: key.map(str::to_string),
        }
    }

    /// Untagged field read from path variables and form values.
    #[must_use]
    pub fn form(name: &str) -> Self {
        Self::new(name, Source::Form, None)
    }

    #[must_use]
    pub fn keys(&self) -> Vec<String> {
        resolve_keys(&self.name, self.key.as_deref())
    }
}

type Project<P, C> = Arc<dyn Fn(&mut P) -> &mut C + Send + Sync>;
type ScalarSet<R> = Arc<dyn Fn(&mut R, Scalar) + Send + Sync>;
type SequenceSet<R> = Arc<dyn Fn(&mut R, Vec<Scalar>) + Send + Sync>;
type ContextSet<R> = Arc<dyn Fn(&mut R, &RequestContext) + Send + Sync>;
type JsonOverlay<R> = fn(&mut R, &[u8]) -> Result<(), serde_json::Error>;

enum Setter<R> {
    Scalar {
        kind: ScalarKind,
        caster: Option<Caster>,
        set: ScalarSet<R>,
    },
    Sequence {
        kind: ScalarKind,
        caster: Option<Caster>,
        set: SequenceSet<R>,
    },
    Context(ContextSet<R>),
}

fn cast(kind: ScalarKind, caster: Option<Caster>, raw: &str) -> Scalar {
    match caster {
        Some(caster) => caster(raw),
        None => kind.zero(),
    }
}

struct FieldRule<R> {
    info: FieldInfo,
    setter: Setter<R>,
}

impl<R: 'static> FieldRule<R> {
    /// Re-root this rule onto a parent record.
    fn lift<P: 'static>(self, project: &Project<P, R>) -> FieldRule<P> {
        let setter = match self.setter {
            Setter::Scalar { kind, caster, set } => {
                let project = Arc::clone(project);
                Setter::Scalar {
                    kind,
                    caster,
                    set: Arc::new(move |outer: &mut P, value: Scalar| set(project(outer), value)),
                }
            }
            Setter::Sequence { kind, caster, set } => {
                let project = Arc::clone(project);
                Setter::Sequence {
                    kind,
                    caster,
                    set: Arc::new(move |outer: &mut P, values: Vec<Scalar>| {
                        set(project(outer), values);
                    }),
                }
            }
            Setter::Context(set) => {
                let project = Arc::clone(project);
                Setter::Context(Arc::new(move |outer: &mut P, ctx: &RequestContext| {
                    set(project(outer), ctx);
                }))
            }
        };
        FieldRule {
            info: self.info,
            setter,
        }
    }
}

/// Collects the binding rules of a record type.
pub struct SchemaBuilder<'a, R> {
    casters: &'a CasterTable,
    rules: Vec<FieldRule<R>>,
    hooks: Vec<ContextSet<R>>,
    json: Option<JsonOverlay<R>>,
}

impl<'a, R: 'static> SchemaBuilder<'a, R> {
    #[must_use]
    pub fn new(casters: &'a CasterTable) -> Self {
        Self {
            casters,
            rules: Vec::new(),
            hooks: Vec::new(),
            json: None,
        }
    }

    /// Table the scalar rules resolve their casters from.
    #[must_use]
    pub fn casters(&self) -> &'a CasterTable {
        self.casters
    }

    fn push(&mut self, spec: FieldSpec, kind: FieldKind, setter: Setter<R>) -> &mut Self {
        let keys = if kind == FieldKind::Context {
            Vec::new()
        } else {
            spec.keys()
        };
        let source = if kind == FieldKind::Context {
            Source::Context
        } else {
            spec.source
        };
        self.rules.push(FieldRule {
            info: FieldInfo {
                name: spec.name,
                source,
                keys,
                kind,
            },
            setter,
        });
        self
    }

    /// Bind any [`BindField`] type; this is what `#[derive(Bindable)]` emits.
    pub fn field<T, F>(&mut self, spec: FieldSpec, project: F) -> &mut Self
    where
        T: BindField,
        F: Fn(&mut R) -> &mut T + Send + Sync + 'static,
    {
        T::attach(self, spec, project);
        self
    }

    /// Scalar field cast with the table's caster for `T::KIND`.
    pub fn scalar<T, F>(&mut self, spec: FieldSpec, project: F) -> &mut Self
    where
        T: ScalarValue,
        F: Fn(&mut R) -> &mut T + Send + Sync + 'static,
    {
        let set: ScalarSet<R> = Arc::new(move |record: &mut R, value: Scalar| {
            *project(record) = T::from_scalar(value);
        });
        let setter = Setter::Scalar {
            kind: T::KIND,
            caster: self.casters.get(T::KIND),
            set,
        };
        self.push(spec, FieldKind::Scalar(T::KIND), setter)
    }

    /// Sequence field: every element of the matched entry is cast.
    pub fn sequence<T, F>(&mut self, spec: FieldSpec, project: F) -> &mut Self
    where
        T: ScalarValue,
        F: Fn(&mut R) -> &mut Vec<T> + Send + Sync + 'static,
    {
        let set: SequenceSet<R> = Arc::new(move |record: &mut R, values: Vec<Scalar>| {
            *project(record) = values.into_iter().map(T::from_scalar).collect();
        });
        let setter = Setter::Sequence {
            kind: T::KIND,
            caster: self.casters.get(T::KIND),
            set,
        };
        self.push(spec, FieldKind::Sequence(T::KIND), setter)
    }

    /// Field receiving the request context.
    pub fn context<F>(&mut self, spec: FieldSpec, inject: F) -> &mut Self
    where
        F: Fn(&mut R, &RequestContext) + Send + Sync + 'static,
    {
        self.push(spec, FieldKind::Context, Setter::Context(Arc::new(inject)))
    }

    /// Flatten a nested record's rules (and its construct hook) into this one.
    pub fn nested<C, F>(&mut self, project: F) -> &mut Self
    where
        C: Bindable,
        F: Fn(&mut R) -> &mut C + Send + Sync + 'static,
    {
        let mut child: SchemaBuilder<'a, C> = SchemaBuilder::new(self.casters);
        C::describe(&mut child);
        child.hook(|record: &mut C, ctx: &RequestContext| record.construct(ctx));

        let project: Project<R, C> = Arc::new(project);
        for rule in child.rules {
            self.rules.push(rule.lift(&project));
        }
        for hook in child.hooks {
            let project = Arc::clone(&project);
            self.hooks
                .push(Arc::new(move |record: &mut R, ctx: &RequestContext| {
                    hook(project(record), ctx);
                }));
        }
        self
    }

    /// Merge a JSON request body over the record after everything else.
    ///
    /// Object keys replace fields by their serde name, nested objects merge
    /// recursively, and fields absent from the body keep their bound value.
    /// A body that does not decode leaves the record untouched. Only the
    /// top-level record of a schema gets an overlay; nested records ignore it.
    pub fn json(&mut self) -> &mut Self
    where
        R: Serialize + DeserializeOwned,
    {
        self.json = Some(overlay_json::<R>);
        self
    }

    /// Run `f` after all rules were applied.
    pub fn hook<F>(&mut self, f: F) -> &mut Self
    where
        F: Fn(&mut R, &RequestContext) + Send + Sync + 'static,
    {
        self.hooks.push(Arc::new(f));
        self
    }

    #[must_use]
    pub fn build(self) -> RecordSchema<R> {
        let fields = self.rules.iter().map(|rule| rule.info.clone()).collect();
        RecordSchema {
            rules: self.rules,
            hooks: self.hooks,
            json: self.json,
            fields,
        }
    }
}

fn overlay_json<R: Serialize + DeserializeOwned>(
    record: &mut R,
    body: &[u8],
) -> Result<(), serde_json::Error> {
    let patch: Value = serde_json::from_slice(body)?;
    let mut merged = serde_json::to_value(&*record)?;
    merge(&mut merged, patch);
    *record = serde_json::from_value(merged)?;
    Ok(())
}

fn merge(target: &mut Value, patch: Value) {
    match (target, patch) {
        (Value::Object(target), Value::Object(patch)) => {
            for (key, value) in patch {
                match target.get_mut(&key) {
                    Some(slot) => merge(slot, value),
                    None => {
                        target.insert(key, value);
                    }
                }
            }
        }
        (target, patch) => *target = patch,
    }
}

/// Compiled binding rules of one record type.
pub struct RecordSchema<R> {
    rules: Vec<FieldRule<R>>,
    hooks: Vec<ContextSet<R>>,
    json: Option<JsonOverlay<R>>,
    fields: Vec<FieldInfo>,
}

impl<R: Bindable> RecordSchema<R> {
    /// Describe `R` against `casters`, appending `R::construct` as the last hook.
    #[must_use]
    pub fn of(casters: &CasterTable) -> Self {
        let mut builder = SchemaBuilder::new(casters);
        R::describe(&mut builder);
        builder.hook(|record: &mut R, ctx: &RequestContext| record.construct(ctx));
        builder.build()
    }
}

impl<R> RecordSchema<R> {
    /// Flattened rules in declaration order.
    #[must_use]
    pub fn fields(&self) -> &[FieldInfo] {
        &self.fields
    }

    /// Whether a JSON body is merged over the bound record.
    #[must_use]
    pub fn reads_json(&self) -> bool {
        self.json.is_some()
    }

    /// Populate `record`. Context fields first, then every other rule in
    /// declaration order, then the hooks, then the JSON overlay. Nothing here
    /// fails: a field whose keys all miss keeps its current value, a bad value
    /// casts to zero and a body that does not decode is logged and skipped.
    pub fn bind(&self, record: &mut R, sources: &Sources<'_>) {
        let ctx = sources.context();
        for rule in &self.rules {
            if let Setter::Context(inject) = &rule.setter {
                inject(record, ctx);
            }
        }
        for rule in &self.rules {
            if !matches!(rule.setter, Setter::Context(_)) {
                rule.apply(record, sources);
            }
        }
        for hook in &self.hooks {
            hook(record, ctx);
        }
        if let Some(overlay) = self.json {
            let request = ctx.request();
            if request.is_json() && !request.body.is_empty() {
                if let Err(err) = overlay(record, &request.body) {
                    warn!(
                        request_id = %ctx.request_id(),
                        error = %err,
                        "JSON body ignored"
                    );
                }
            }
        }
    }
}

impl<R> FieldRule<R> {
    /// Try the candidate keys in order; the first one that yields a value wins.
    fn apply(&self, record: &mut R, sources: &Sources<'_>) {
        for key in &self.info.keys {
            let Some(found) = sources.lookup(self.info.source, key) else {
                continue;
            };
            let bound = match &self.setter {
                Setter::Scalar { kind, caster, set } => match found.first() {
                    Some(raw) => {
                        set(record, cast(*kind, *caster, &raw));
                        true
                    }
                    None => false,
                },
                Setter::Sequence { kind, caster, set } => {
                    let raw = found.all();
                    if raw.is_empty() {
                        false
                    } else {
                        set(
                            record,
                            raw.iter().map(|value| cast(*kind, *caster, value)).collect(),
                        );
                        true
                    }
                }
                Setter::Context(_) => return,
            };
            if bound {
                trace!(field = %self.info.name, key = %key, source = ?self.info.source, "Field bound");
                return;
            }
        }
    }
}

/// A record that handlers take as their parameter.
///
/// Usually derived with `#[derive(Bindable)]`.
pub trait Bindable: Sized + Send + 'static {
    /// Declare every bound field.
    fn describe(schema: &mut SchemaBuilder<'_, Self>);

    /// Runs once after binding with the live request.
    fn construct(&mut self, _ctx: &RequestContext) {}
}

/// A type that can appear as a field of a [`Bindable`] record.
pub trait BindField: Sized + 'static {
    fn attach<R, F>(schema: &mut SchemaBuilder<'_, R>, spec: FieldSpec, project: F)
    where
        R: 'static,
        F: Fn(&mut R) -> &mut Self + Send + Sync + 'static;
}

macro_rules! scalar_fields {
    ($($ty:ty),* $(,)?) => {
        $(
            impl BindField for $ty {
                fn attach<R, F>(schema: &mut SchemaBuilder<'_, R>, spec: FieldSpec, project: F)
                where
                    R: 'static,
                    F: Fn(&mut R) -> &mut Self + Send + Sync + 'static,
                {
                    schema.scalar(spec, project);
                }
            }

            impl BindField for Vec<$ty> {
                fn attach<R, F>(schema: &mut SchemaBuilder<'_, R>, spec: FieldSpec, project: F)
                where
                    R: 'static,
                    F: Fn(&mut R) -> &mut Self + Send + Sync + 'static,
                {
                    schema.sequence(spec, project);
                }
            }
        )*
    };
}

scalar_fields!(
    bool, i8, i16, i32, i64, isize, u8, u16, u32, u64, usize, f32, f64, String, Timestamp,
);

impl BindField for RequestContext {
    fn attach<R, F>(schema: &mut SchemaBuilder<'_, R>, spec: FieldSpec, project: F)
    where
        R: 'static,
        F: Fn(&mut R) -> &mut Self + Send + Sync + 'static,
    {
        schema.context(spec, move |record: &mut R, ctx: &RequestContext| {
            *project(record) = ctx.clone();
        });
    }
}

impl BindField for Option<RequestContext> {
    fn attach<R, F>(schema: &mut SchemaBuilder<'_, R>, spec: FieldSpec, project: F)
    where
        R: 'static,
        F: Fn(&mut R) -> &mut Self + Send + Sync + 'static,
    {
        schema.context(spec, move |record: &mut R, ctx: &RequestContext| {
            *project(record) = Some(ctx.clone());
        });
    }
}

impl Bindable for () {
    fn describe(_schema: &mut SchemaBuilder<'_, Self>) {}
}

macro_rules! tuple_bindable {
    ($($name:ident . $idx:tt),+) => {
        impl<$($name: Bindable),+> Bindable for ($($name,)+) {
            fn describe(schema: &mut SchemaBuilder<'_, Self>) {
                $(
                    schema.nested(|record: &mut Self| &mut record.$idx);
                )+
            }
        }
    };
}

tuple_bindable!(A.0);
tuple_bindable!(A.0, B.1);
tuple_bindable!(A.0, B.1, C.2);
tuple_bindable!(A.0, B.1, C.2, D.3);
