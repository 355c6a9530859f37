//! Merging the units of one stage into a single executable.
//!
//! The unit that defines `main` is cloned and becomes the linked shader.
//! Top-level statements of every unit are spliced into the start of
//! `main`, then every function the linked shader calls is pulled in from
//! the units and the built-in libraries until no call is left unresolved.

use alloc::{format, string::String, vec::Vec};

use log::{debug, trace};
use lpc_glir::{
    clone_inst_into, clone_signature_into, verify, walk_body, walk_shader, CallCollector, Inst,
    InstData, Item, ScratchRemap, ShaderIr, Type, Var, VarRemap, VariableMode,
};

use crate::{
    array_sizing::size_implicit_arrays,
    cross_validate::cross_validate_globals,
    diagnostics::Diagnostics,
    error::{LinkError, LinkResult},
    geometry::{link_gs_inout_layout_qualifiers, resize_geometry_inputs, GeometryLayout},
    interface_blocks::validate_intrastage_interface_blocks,
    shader::{LinkedShader, Shader},
    stage::ShaderStage,
    symbols::SymbolTable,
    uniform_blocks::{link_uniform_blocks, refresh_uniform_block_layouts},
};

/// Remaps variables of a unit being copied into the linked shader.
///
/// Locals, parameters and temporaries get fresh copies. Globals resolve by
/// name to the linked shader's declaration; a global the linked shader
/// lacks is copied in and declared at the top.
struct LinkRemap<'a> {
    locals: ScratchRemap,
    symbols: &'a mut SymbolTable,
}

impl<'a> LinkRemap<'a> {
    fn new(symbols: &'a mut SymbolTable) -> Self {
        Self {
            locals: ScratchRemap::new(),
            symbols,
        }
    }
}

impl VarRemap for LinkRemap<'_> {
    fn declare(&mut self, src: &ShaderIr, var: Var, dst: &mut ShaderIr) -> Var {
        self.locals.declare(src, var, dst)
    }

    fn reference(&mut self, src: &ShaderIr, var: Var, dst: &mut ShaderIr) -> Var {
        if let Some(local) = self.locals.get(var) {
            return local;
        }
        let variable = &src.vars[var];
        if let Some(global) = self.symbols.get_variable(&variable.name) {
            return global;
        }
        trace!("copying global '{}' into linked shader", variable.name);
        let global = dst.push_var(variable.clone());
        dst.items.insert(0, Item::Variable(global));
        self.symbols.add_variable(&variable.name, global);
        self.locals.insert(var, global);
        global
    }
}

/// Take the top-level statements and temporaries out of `ir`.
///
/// Temporaries turn into declarations so they can live in `main`.
fn move_non_declarations(ir: &mut ShaderIr) -> Vec<Inst> {
    let mut moved = Vec::new();
    for item in core::mem::take(&mut ir.items) {
        match item {
            Item::Inst(inst) => moved.push(inst),
            Item::Variable(var) if ir.vars[var].mode == VariableMode::Temporary => {
                moved.push(ir.push_inst(InstData::Declare(var)));
            }
            other => ir.items.push(other),
        }
    }
    moved
}

/// Copy the top-level statements and temporaries of `src` into `dst`.
fn copy_non_declarations(
    src: &ShaderIr,
    dst: &mut ShaderIr,
    symbols: &mut SymbolTable,
) -> Vec<Inst> {
    let mut remap = LinkRemap::new(symbols);
    let mut copied = Vec::new();
    for item in &src.items {
        match item {
            Item::Inst(inst) => copied.push(clone_inst_into(src, *inst, dst, &mut remap)),
            Item::Variable(var) if src.vars[*var].mode == VariableMode::Temporary => {
                let local = remap.declare(src, *var, dst);
                copied.push(dst.push_inst(InstData::Declare(local)));
            }
            _ => {}
        }
    }
    copied
}

fn calls_in_shader(ir: &ShaderIr) -> Vec<(String, Vec<Type>)> {
    let mut collector = CallCollector { calls: Vec::new() };
    walk_shader(ir, &mut collector);
    collector.calls
}

/// Pull in the definition of every function `linked` calls.
///
/// Definitions are searched in `libraries` in order. A prototype in the
/// linked shader is replaced by the definition; calls made by copied
/// functions are resolved in turn.
pub fn link_function_calls(
    linked: &mut ShaderIr,
    symbols: &mut SymbolTable,
    libraries: &[&ShaderIr],
) -> LinkResult<()> {
    let mut pending = calls_in_shader(linked);
    let mut next = 0;
    while next < pending.len() {
        let (name, args) = pending[next].clone();
        next += 1;
        if linked.find_defined_signature(&name, &args).is_some() {
            continue;
        }
        let Some((src, found)) = libraries
            .iter()
            .find_map(|lib| lib.find_defined_signature(&name, &args).map(|s| (*lib, s)))
        else {
            return Err(LinkError::UnresolvedFunction { name });
        };

        debug!("linking function '{}'", name);
        let mut remap = LinkRemap::new(symbols);
        let sig = clone_signature_into(src, src.signature(found), linked, &mut remap);
        let mut collector = CallCollector { calls: Vec::new() };
        walk_body(linked, &sig.body, &mut collector);
        match linked.find_signature(&name, &args) {
            Some(prototype) => *linked.signature_mut(prototype) = sig,
            None => {
                linked.add_signature(&name, sig);
            }
        }
        pending.extend(collector.calls);
    }
    Ok(())
}

fn check_multiply_defined(units: &[&Shader]) -> LinkResult<()> {
    for (i, unit) in units.iter().enumerate() {
        let ir = &unit.ir;
        for func in ir.functions() {
            let function = &ir.funcs[func];
            for sig in &function.signatures {
                if !sig.is_defined || sig.is_builtin {
                    continue;
                }
                let params = ir.param_types(sig);
                for other in &units[i + 1..] {
                    let found = other
                        .ir
                        .find_defined_signature(&function.name, &params)
                        .map(|s| other.ir.signature(s));
                    if found.is_some_and(|s| !s.is_builtin) {
                        return Err(LinkError::FunctionMultiplyDefined {
                            name: function.name.clone(),
                        });
                    }
                }
            }
        }
    }
    Ok(())
}

/// Link the units of one stage.
///
/// Errors are recorded in `diag`; `None` means the stage failed to link.
pub fn link_intrastage_shaders(
    stage: ShaderStage,
    units: &[&Shader],
    version: u32,
    diag: &mut Diagnostics,
) -> Option<LinkedShader> {
    let merged = diag.record(cross_validate_globals(units.iter().map(|u| &u.ir), false))?;
    diag.record(validate_intrastage_interface_blocks(units))?;
    let mut uniform_blocks = diag.record(link_uniform_blocks(units))?;
    diag.record(check_multiply_defined(units))?;

    let Some(main_unit) = units.iter().position(|u| u.ir.main_signature().is_some()) else {
        diag.error(LinkError::MissingMain { stage });
        return None;
    };

    let geometry = if stage == ShaderStage::Geometry {
        diag.record(link_gs_inout_layout_qualifiers(version, units))?
    } else {
        GeometryLayout::default()
    };

    let mut ir = units[main_unit].ir.clone();
    let mut symbols = SymbolTable::from_ir(&ir);

    let mut prologue = move_non_declarations(&mut ir);
    for (i, unit) in units.iter().enumerate() {
        if i != main_unit {
            prologue.extend(copy_non_declarations(&unit.ir, &mut ir, &mut symbols));
        }
    }
    if let Some(main) = ir.main_signature() {
        let body = &mut ir.signature_mut(main).body;
        prologue.append(body);
        *body = prologue;
    }

    let libraries: Vec<&ShaderIr> = units
        .iter()
        .map(|u| &u.ir)
        .chain(units.iter().flat_map(|u| u.builtins_to_link.iter().map(|b| &**b)))
        .collect();
    diag.record(link_function_calls(&mut ir, &mut symbols, &libraries))?;

    merged.apply_to(&mut ir);

    if let Err(errors) = verify(&ir) {
        let message = errors
            .iter()
            .map(|e| format!("{}", e))
            .collect::<Vec<_>>()
            .join("; ");
        diag.error(LinkError::InvalidIr { stage, message });
        return None;
    }

    if stage == ShaderStage::Geometry && !resize_geometry_inputs(&mut ir, geometry.vertices_in(), diag)
    {
        return None;
    }

    size_implicit_arrays(&mut ir);
    refresh_uniform_block_layouts(&mut uniform_blocks, &ir);

    let mut linked = LinkedShader::new(stage, ir);
    linked.uniform_blocks = uniform_blocks;
    linked.geometry = geometry;
    debug!(
        "{} stage linked from {} unit(s), {} uniform block(s)",
        stage,
        units.len(),
        linked.uniform_blocks.len()
    );
    Some(linked)
}

#[cfg(test)]
mod tests {
    use alloc::{sync::Arc, vec};

    use lpc_glir::{
        Constant, InterfacePacking, InterfaceType, ShaderBuilder, StructField, Variable,
    };

    use super::*;

    fn unit(stage: ShaderStage, ir: ShaderIr) -> Shader {
        Shader::new(stage, 130, ir)
    }

    #[test]
    fn test_statements_spliced_into_main() {
        // float g = 1.0; void helper(); void main() { helper(); }
        let mut a = ShaderBuilder::new();
        let g = a.global(Variable::new("g", Type::FLOAT, VariableMode::Auto));
        let one = a.float(1.0);
        let init = a.assign_var(g, one);
        a.top_level(init);
        a.prototype("helper", Type::Void, vec![]);
        let call = a.call("helper", vec![], None);
        a.define_function("main", Type::Void, vec![], vec![call]);
        let a = unit(ShaderStage::Vertex, a.finish());

        // float g; out vec4 c; void helper() { c = vec4(g); }
        let mut b = ShaderBuilder::new();
        let g2 = b.global(Variable::new("g", Type::FLOAT, VariableMode::Auto));
        let c = b.global(Variable::new("c", Type::vec(4), VariableMode::ShaderOut));
        let value = b.var_ref(g2);
        let splat = b.swizzle(value, &[0, 0, 0, 0]);
        let write = b.assign_var(c, splat);
        b.define_function("helper", Type::Void, vec![], vec![write]);
        let b = unit(ShaderStage::Vertex, b.finish());

        let mut diag = Diagnostics::new();
        let linked = link_intrastage_shaders(ShaderStage::Vertex, &[&b, &a], 130, &mut diag)
            .expect("linked");
        assert!(!diag.has_errors(), "{}", diag.log());

        let ir = &linked.ir;
        let main = ir.main_signature().expect("main");
        let body = &ir.signature(main).body;
        assert_eq!(body.len(), 2);
        assert!(matches!(ir.insts[body[0]], InstData::Assign { .. }));
        assert!(ir.find_defined_signature("helper", &[]).is_some());
        assert!(ir.global_var("c").is_some());
        assert!(ir.items.iter().all(|i| !matches!(i, Item::Inst(_))));
    }

    #[test]
    fn test_missing_main() {
        let mut b = ShaderBuilder::new();
        b.define_function("helper", Type::Void, vec![], vec![]);
        let u = unit(ShaderStage::Fragment, b.finish());
        let mut diag = Diagnostics::new();
        assert!(link_intrastage_shaders(ShaderStage::Fragment, &[&u], 130, &mut diag).is_none());
        assert_eq!(diag.log(), "error: fragment shader lacks `main'\n");
    }

    #[test]
    fn test_multiply_defined() {
        let build = || {
            let mut b = ShaderBuilder::new();
            b.define_function("f", Type::Void, vec![], vec![]);
            b.define_function("main", Type::Void, vec![], vec![]);
            unit(ShaderStage::Vertex, b.finish())
        };
        let (x, y) = (build(), build());
        let mut diag = Diagnostics::new();
        assert!(link_intrastage_shaders(ShaderStage::Vertex, &[&x, &y], 130, &mut diag).is_none());
        assert_eq!(diag.entries()[0].message, "function `f' is multiply defined");
    }

    #[test]
    fn test_unresolved_call() {
        let mut b = ShaderBuilder::new();
        b.prototype("missing", Type::Void, vec![]);
        let call = b.call("missing", vec![], None);
        b.define_function("main", Type::Void, vec![], vec![call]);
        let u = unit(ShaderStage::Vertex, b.finish());
        let mut diag = Diagnostics::new();
        assert!(link_intrastage_shaders(ShaderStage::Vertex, &[&u], 130, &mut diag).is_none());
        assert_eq!(
            diag.entries()[0].message,
            "unresolved reference to function `missing'"
        );
    }

    #[test]
    fn test_builtin_library() {
        let mut lib = ShaderBuilder::new();
        let x = lib.param(Variable::new("x", Type::FLOAT, VariableMode::FunctionIn));
        let value = lib.var_ref(x);
        let ret = lib.return_(Some(value));
        lib.define_builtin("half", Type::FLOAT, vec![x], vec![ret]);
        let lib = Arc::new(lib.finish());

        let mut b = ShaderBuilder::new();
        let out = b.global(Variable::new("o", Type::FLOAT, VariableMode::ShaderOut));
        let p = b.param(Variable::new("x", Type::FLOAT, VariableMode::FunctionIn));
        b.prototype("half", Type::FLOAT, vec![p]);
        let arg = b.constant(Constant::float(2.0));
        let result = b.var_ref(out);
        let call = b.call("half", vec![arg], Some(result));
        b.define_function("main", Type::Void, vec![], vec![call]);
        let u = unit(ShaderStage::Vertex, b.finish()).with_builtins(vec![lib]);

        let mut diag = Diagnostics::new();
        let linked = link_intrastage_shaders(ShaderStage::Vertex, &[&u], 130, &mut diag)
            .expect("linked");
        let ir = &linked.ir;
        let sig = ir
            .find_defined_signature("half", &[Type::FLOAT])
            .map(|s| ir.signature(s));
        assert!(sig.is_some_and(|s| s.is_builtin));
        assert_eq!(ir.funcs[ir.function("half").expect("half")].signatures.len(), 1);
    }

    #[test]
    fn test_block_layout_after_implicit_sizing() {
        // uniform Params { vec4 tint; float weights[]; }; out float o; o = weights[2];
        let params = InterfaceType::new(
            "Params",
            vec![
                StructField::new("tint", Type::vec(4)),
                StructField::new("weights", Type::unsized_array(Type::FLOAT)),
            ],
            InterfacePacking::Std140,
        );
        let mut b = ShaderBuilder::new();
        b.global(
            Variable::new("tint", Type::vec(4), VariableMode::Uniform).with_interface(params.clone()),
        );
        let weights = b.global(
            Variable::new("weights", Type::unsized_array(Type::FLOAT), VariableMode::Uniform)
                .with_interface(params),
        );
        let out = b.global(Variable::new("o", Type::FLOAT, VariableMode::ShaderOut));
        let array = b.var_ref(weights);
        let third = b.index_const(array, 2);
        let store = b.assign_var(out, third);
        b.define_function("main", Type::Void, vec![], vec![store]);
        let u = unit(ShaderStage::Vertex, b.finish());

        let mut diag = Diagnostics::new();
        let linked = link_intrastage_shaders(ShaderStage::Vertex, &[&u], 140, &mut diag)
            .expect("linked");
        let block = &linked.uniform_blocks[0];
        assert_eq!(block.members[1].ty, Type::array(Type::FLOAT, 3));
        assert_eq!(block.members[1].offset, 16);
        assert_eq!(block.data_size, 16 + 3 * 16);
    }
}
