//! Module conversion driver.
//!
//! Discovery registers every method, event and static field before any body
//! is translated, so forward calls resolve. Translation then runs method by
//! method in registration order; each body is locally linked as soon as it
//! is emitted. The static initializer, if any, is synthesized last and the
//! global link pass lays everything out.

use indexmap::{IndexMap, IndexSet};
use neoil_bytecode::Opcode;
use neoil_core::{MethodKind, Op, SourceInstruction, SourceModule, TypeKind, TypeRef};

use crate::compiler::Limits;
use crate::error::CompileError;
use crate::link::{link_global, link_local};
use crate::program::{Event, Field, INITIALIZER, Method, Program};
use crate::statics;
use crate::trace::Tracer;
use crate::translate::{ModuleIndex, Translator};

pub(crate) fn convert<T: Tracer>(
    module: &SourceModule,
    limits: &Limits,
    tracer: &mut T,
) -> Result<Program, CompileError> {
    let mut program = Program::default();
    let types: Vec<_> = module
        .types
        .iter()
        .filter(|t| t.kind != TypeKind::Synthesized)
        .collect();

    let mut methods = IndexMap::new();
    let mut compiled = IndexSet::new();
    let mut events = IndexMap::new();
    for ty in &types {
        for method in &ty.methods {
            if methods.insert(method.name.as_str(), method).is_some() {
                return Err(CompileError::DuplicateMethod(method.name.clone()));
            }
            if method.kind != MethodKind::Normal || method.binding.is_some() {
                continue;
            }
            compiled.insert(method.name.as_str());
            tracer.trace_method_registered(&method.name, &method.display_name);
            program.methods.insert(
                method.name.clone(),
                Method::new(
                    &method.name,
                    &method.display_name,
                    method.is_public,
                    ty.kind == TypeKind::Contract,
                    method.params.clone(),
                    method.return_type.clone(),
                ),
            );
        }
        for event in &ty.events {
            let key = format!("{}::{}", ty.name, event.name);
            program.events.insert(
                key.clone(),
                Event {
                    name: event.name.clone(),
                    display_name: event.display_name.clone(),
                    params: event.params.clone(),
                },
            );
            events.insert(key, event);
        }
    }

    let layout = statics::resolve(module, limits.max_static_fields(), tracer)?;
    for (key, &slot) in &layout.slots {
        program.fields.insert(
            key.clone(),
            Field {
                name: key.clone(),
                slot,
            },
        );
    }
    if layout.needs_initializer() && program.methods.contains_key(INITIALIZER) {
        return Err(CompileError::DuplicateMethod(INITIALIZER.to_string()));
    }

    let index = ModuleIndex {
        methods,
        compiled,
        events,
        statics: layout,
    };

    for name in &index.compiled {
        let source = index.methods[name];
        let params = check_limit(name, "parameters", source.params.len(), limits.max_params())?;
        let locals = check_limit(name, "locals", source.locals.len(), limits.max_locals())?;

        let mut translator = Translator::new(&index, name, locals, params, &source.body);
        if locals > 0 || params > 0 {
            translator
                .emitter()
                .emit(Opcode::InitSlot, vec![locals as u8, params as u8]);
        }
        translator.translate_all()?;
        let mut body = translator.finish();
        link_local(name, &mut body)?;
        store_body(&mut program, name, body, tracer)?;
    }

    if index.statics.needs_initializer() {
        let slots = index.statics.slots.len();
        let locals = check_limit(INITIALIZER, "locals", locals_used(&index.statics.init), limits.max_locals())?;

        let mut translator = Translator::new(&index, INITIALIZER, locals, 0, &index.statics.init);
        let em = translator.emitter();
        if slots > 0 {
            em.emit(Opcode::InitSSlot, vec![slots as u8]);
        }
        if locals > 0 {
            em.emit(Opcode::InitSlot, vec![locals as u8, 0]);
        }
        translator.translate_all()?;
        let mut body = translator.finish();
        link_local(INITIALIZER, &mut body)?;

        program.methods.insert(
            INITIALIZER.to_string(),
            Method::new(INITIALIZER, INITIALIZER, true, true, Vec::new(), TypeRef::Void),
        );
        store_body(&mut program, INITIALIZER, body, tracer)?;
        tracer.trace_initializer(slots, index.statics.statements);
    }

    link_global(&mut program, tracer)?;
    Ok(program)
}

fn store_body<T: Tracer>(
    program: &mut Program,
    name: &str,
    body: crate::emit::EmittedBody,
    tracer: &mut T,
) -> Result<(), CompileError> {
    let method = program
        .methods
        .get_mut(name)
        .ok_or_else(|| CompileError::consistency(name, "translated method was never registered"))?;
    method.code = body.code;
    method.relocations = body.relocations;
    tracer.trace_method_translated(name, method.size(), method.relocations.len());
    Ok(())
}

fn check_limit(scope: &str, what: &'static str, count: usize, max: usize) -> Result<usize, CompileError> {
    if count > max {
        return Err(CompileError::ResourceLimit {
            scope: scope.to_string(),
            what,
            count,
            max,
        });
    }
    Ok(count)
}

/// Number of local slots referenced by `code`.
fn locals_used(code: &[SourceInstruction]) -> usize {
    code.iter()
        .filter_map(|i| match i.op {
            Op::LdLoc(n) | Op::StLoc(n) | Op::LdLocA(n) => Some(n as usize + 1),
            _ => None,
        })
        .max()
        .unwrap_or(0)
}
