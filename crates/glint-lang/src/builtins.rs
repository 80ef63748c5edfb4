//! Built-in functions and variables.
//!
//! Signatures are written as GLSL prototypes using the generic type names of
//! the GLSL reference pages (`genFType`, `vec`, `gsampler2D`, ...) and expanded
//! once, on first use, into concrete overloads. The resulting tables are
//! immutable and shared by every analysis in the process.

use std::collections::HashMap;
use std::sync::{Arc, OnceLock};

use crate::types::{
    FunctionSignature, ParamDirection, ParamType, ScalarKind, StructField, StructType, Type,
};

const FUNCTIONS: &[&str] = &[
    // Angle and trigonometry
    "genFType radians(genFType)",
    "genFType degrees(genFType)",
    "genFType sin(genFType)",
    "genFType cos(genFType)",
    "genFType tan(genFType)",
    "genFType asin(genFType)",
    "genFType acos(genFType)",
    "genFType atan(genFType, genFType)",
    "genFType atan(genFType)",
    "genFType sinh(genFType)",
    "genFType cosh(genFType)",
    "genFType tanh(genFType)",
    "genFType asinh(genFType)",
    "genFType acosh(genFType)",
    "genFType atanh(genFType)",
    // Exponential
    "genFType pow(genFType, genFType)",
    "genFType exp(genFType)",
    "genFType log(genFType)",
    "genFType exp2(genFType)",
    "genFType log2(genFType)",
    "genFType sqrt(genFType)",
    "genDType sqrt(genDType)",
    "genFType inversesqrt(genFType)",
    "genDType inversesqrt(genDType)",
    // Common
    "genFType abs(genFType)",
    "genIType abs(genIType)",
    "genDType abs(genDType)",
    "genFType sign(genFType)",
    "genIType sign(genIType)",
    "genDType sign(genDType)",
    "genFType floor(genFType)",
    "genDType floor(genDType)",
    "genFType trunc(genFType)",
    "genDType trunc(genDType)",
    "genFType round(genFType)",
    "genDType round(genDType)",
    "genFType roundEven(genFType)",
    "genDType roundEven(genDType)",
    "genFType ceil(genFType)",
    "genDType ceil(genDType)",
    "genFType fract(genFType)",
    "genDType fract(genDType)",
    "genFType mod(genFType, float)",
    "genFType mod(genFType, genFType)",
    "genDType mod(genDType, double)",
    "genDType mod(genDType, genDType)",
    "genFType modf(genFType, out genFType)",
    "genDType modf(genDType, out genDType)",
    "genFType min(genFType, genFType)",
    "genFType min(genFType, float)",
    "genDType min(genDType, genDType)",
    "genDType min(genDType, double)",
    "genIType min(genIType, genIType)",
    "genIType min(genIType, int)",
    "genUType min(genUType, genUType)",
    "genUType min(genUType, uint)",
    "genFType max(genFType, genFType)",
    "genFType max(genFType, float)",
    "genDType max(genDType, genDType)",
    "genDType max(genDType, double)",
    "genIType max(genIType, genIType)",
    "genIType max(genIType, int)",
    "genUType max(genUType, genUType)",
    "genUType max(genUType, uint)",
    "genFType clamp(genFType, genFType, genFType)",
    "genFType clamp(genFType, float, float)",
    "genDType clamp(genDType, genDType, genDType)",
    "genDType clamp(genDType, double, double)",
    "genIType clamp(genIType, genIType, genIType)",
    "genIType clamp(genIType, int, int)",
    "genUType clamp(genUType, genUType, genUType)",
    "genUType clamp(genUType, uint, uint)",
    "genFType mix(genFType, genFType, genFType)",
    "genFType mix(genFType, genFType, float)",
    "genDType mix(genDType, genDType, genDType)",
    "genDType mix(genDType, genDType, double)",
    "genFType mix(genFType, genFType, genBType)",
    "genDType mix(genDType, genDType, genBType)",
    "genIType mix(genIType, genIType, genBType)",
    "genUType mix(genUType, genUType, genBType)",
    "genBType mix(genBType, genBType, genBType)",
    "genFType step(genFType, genFType)",
    "genFType step(float, genFType)",
    "genDType step(genDType, genDType)",
    "genDType step(double, genDType)",
    "genFType smoothstep(genFType, genFType, genFType)",
    "genFType smoothstep(float, float, genFType)",
    "genDType smoothstep(genDType, genDType, genDType)",
    "genDType smoothstep(double, double, genDType)",
    "genBType isnan(genFType)",
    "genBType isnan(genDType)",
    "genBType isinf(genFType)",
    "genBType isinf(genDType)",
    "genIType floatBitsToInt(genFType)",
    "genUType floatBitsToUint(genFType)",
    "genFType intBitsToFloat(genIType)",
    "genFType uintBitsToFloat(genUType)",
    "genFType fma(genFType, genFType, genFType)",
    "genDType fma(genDType, genDType, genDType)",
    "genFType frexp(genFType, out genIType)",
    "genFType ldexp(genFType, genIType)",
    // Packing
    "uint packUnorm2x16(vec2)",
    "uint packSnorm2x16(vec2)",
    "uint packUnorm4x8(vec4)",
    "uint packSnorm4x8(vec4)",
    "vec2 unpackUnorm2x16(uint)",
    "vec2 unpackSnorm2x16(uint)",
    "vec4 unpackUnorm4x8(uint)",
    "vec4 unpackSnorm4x8(uint)",
    "uint packHalf2x16(vec2)",
    "vec2 unpackHalf2x16(uint)",
    "double packDouble2x32(uvec2)",
    "uvec2 unpackDouble2x32(double)",
    // Geometric
    "float length(genFType)",
    "double length(genDType)",
    "float distance(genFType, genFType)",
    "double distance(genDType, genDType)",
    "float dot(genFType, genFType)",
    "double dot(genDType, genDType)",
    "vec3 cross(vec3, vec3)",
    "dvec3 cross(dvec3, dvec3)",
    "genFType normalize(genFType)",
    "genDType normalize(genDType)",
    "genFType faceforward(genFType, genFType, genFType)",
    "genDType faceforward(genDType, genDType, genDType)",
    "genFType reflect(genFType, genFType)",
    "genDType reflect(genDType, genDType)",
    "genFType refract(genFType, genFType, float)",
    "genDType refract(genDType, genDType, double)",
    // Matrix
    "mat matrixCompMult(mat, mat)",
    "dmat matrixCompMult(dmat, dmat)",
    "mat2 outerProduct(vec2, vec2)",
    "mat3 outerProduct(vec3, vec3)",
    "mat4 outerProduct(vec4, vec4)",
    "mat2x3 outerProduct(vec3, vec2)",
    "mat3x2 outerProduct(vec2, vec3)",
    "mat2x4 outerProduct(vec4, vec2)",
    "mat4x2 outerProduct(vec2, vec4)",
    "mat3x4 outerProduct(vec4, vec3)",
    "mat4x3 outerProduct(vec3, vec4)",
    "mat2 transpose(mat2)",
    "mat3 transpose(mat3)",
    "mat4 transpose(mat4)",
    "mat2x3 transpose(mat3x2)",
    "mat3x2 transpose(mat2x3)",
    "mat2x4 transpose(mat4x2)",
    "mat4x2 transpose(mat2x4)",
    "mat3x4 transpose(mat4x3)",
    "mat4x3 transpose(mat3x4)",
    "float determinant(mat2)",
    "float determinant(mat3)",
    "float determinant(mat4)",
    "mat2 inverse(mat2)",
    "mat3 inverse(mat3)",
    "mat4 inverse(mat4)",
    // Vector relational
    "bvec lessThan(vec, vec)",
    "bvec lessThan(ivec, ivec)",
    "bvec lessThan(uvec, uvec)",
    "bvec lessThanEqual(vec, vec)",
    "bvec lessThanEqual(ivec, ivec)",
    "bvec lessThanEqual(uvec, uvec)",
    "bvec greaterThan(vec, vec)",
    "bvec greaterThan(ivec, ivec)",
    "bvec greaterThan(uvec, uvec)",
    "bvec greaterThanEqual(vec, vec)",
    "bvec greaterThanEqual(ivec, ivec)",
    "bvec greaterThanEqual(uvec, uvec)",
    "bvec equal(vec, vec)",
    "bvec equal(ivec, ivec)",
    "bvec equal(uvec, uvec)",
    "bvec equal(bvec, bvec)",
    "bvec notEqual(vec, vec)",
    "bvec notEqual(ivec, ivec)",
    "bvec notEqual(uvec, uvec)",
    "bvec notEqual(bvec, bvec)",
    "bool any(bvec)",
    "bool all(bvec)",
    "bvec not(bvec)",
    // Integer
    "genUType uaddCarry(genUType, genUType, out genUType)",
    "genUType usubBorrow(genUType, genUType, out genUType)",
    "void umulExtended(genUType, genUType, out genUType, out genUType)",
    "void imulExtended(genIType, genIType, out genIType, out genIType)",
    "genIType bitfieldExtract(genIType, int, int)",
    "genUType bitfieldExtract(genUType, int, int)",
    "genIType bitfieldInsert(genIType, genIType, int, int)",
    "genUType bitfieldInsert(genUType, genUType, int, int)",
    "genIType bitfieldReverse(genIType)",
    "genUType bitfieldReverse(genUType)",
    "genIType bitCount(genIType)",
    "genIType bitCount(genUType)",
    "genIType findLSB(genIType)",
    "genIType findLSB(genUType)",
    "genIType findMSB(genIType)",
    "genIType findMSB(genUType)",
    // Texture queries
    "int textureSize(gsampler1D, int)",
    "ivec2 textureSize(gsampler2D, int)",
    "ivec3 textureSize(gsampler3D, int)",
    "ivec2 textureSize(gsamplerCube, int)",
    "ivec2 textureSize(gsampler1DArray, int)",
    "ivec3 textureSize(gsampler2DArray, int)",
    "ivec3 textureSize(gsamplerCubeArray, int)",
    "ivec2 textureSize(gsampler2DRect)",
    "int textureSize(gsamplerBuffer)",
    "ivec2 textureSize(gsampler2DMS)",
    "ivec2 textureSize(sampler2DShadow, int)",
    "ivec2 textureSize(samplerCubeShadow, int)",
    "ivec3 textureSize(sampler2DArrayShadow, int)",
    "vec2 textureQueryLod(gsampler2D, vec2)",
    "vec2 textureQueryLod(gsampler3D, vec3)",
    "vec2 textureQueryLod(gsamplerCube, vec3)",
    "int textureQueryLevels(gsampler2D)",
    "int textureQueryLevels(gsampler3D)",
    "int textureQueryLevels(gsamplerCube)",
    "int textureSamples(gsampler2DMS)",
    // Texture lookups
    "gvec4 texture(gsampler1D, float)",
    "gvec4 texture(gsampler1D, float, float)",
    "gvec4 texture(gsampler2D, vec2)",
    "gvec4 texture(gsampler2D, vec2, float)",
    "gvec4 texture(gsampler3D, vec3)",
    "gvec4 texture(gsampler3D, vec3, float)",
    "gvec4 texture(gsamplerCube, vec3)",
    "gvec4 texture(gsamplerCube, vec3, float)",
    "gvec4 texture(gsampler1DArray, vec2)",
    "gvec4 texture(gsampler2DArray, vec3)",
    "gvec4 texture(gsampler2DArray, vec3, float)",
    "gvec4 texture(gsamplerCubeArray, vec4)",
    "gvec4 texture(gsampler2DRect, vec2)",
    "float texture(sampler1DShadow, vec3)",
    "float texture(sampler2DShadow, vec3)",
    "float texture(sampler2DShadow, vec3, float)",
    "float texture(samplerCubeShadow, vec4)",
    "float texture(sampler2DArrayShadow, vec4)",
    "float texture(samplerCubeArrayShadow, vec4, float)",
    "gvec4 textureProj(gsampler2D, vec3)",
    "gvec4 textureProj(gsampler2D, vec4)",
    "gvec4 textureProj(gsampler3D, vec4)",
    "float textureProj(sampler2DShadow, vec4)",
    "gvec4 textureLod(gsampler1D, float, float)",
    "gvec4 textureLod(gsampler2D, vec2, float)",
    "gvec4 textureLod(gsampler3D, vec3, float)",
    "gvec4 textureLod(gsamplerCube, vec3, float)",
    "gvec4 textureLod(gsampler2DArray, vec3, float)",
    "gvec4 textureLod(gsamplerCubeArray, vec4, float)",
    "float textureLod(sampler2DShadow, vec3, float)",
    "gvec4 textureOffset(gsampler2D, vec2, ivec2)",
    "gvec4 textureOffset(gsampler2D, vec2, ivec2, float)",
    "gvec4 textureOffset(gsampler3D, vec3, ivec3)",
    "gvec4 textureOffset(gsampler2DArray, vec3, ivec2)",
    "gvec4 textureLodOffset(gsampler2D, vec2, float, ivec2)",
    "gvec4 texelFetch(gsampler1D, int, int)",
    "gvec4 texelFetch(gsampler2D, ivec2, int)",
    "gvec4 texelFetch(gsampler3D, ivec3, int)",
    "gvec4 texelFetch(gsampler2DRect, ivec2)",
    "gvec4 texelFetch(gsampler1DArray, ivec2, int)",
    "gvec4 texelFetch(gsampler2DArray, ivec3, int)",
    "gvec4 texelFetch(gsamplerBuffer, int)",
    "gvec4 texelFetch(gsampler2DMS, ivec2, int)",
    "gvec4 texelFetch(gsampler2DMSArray, ivec3, int)",
    "gvec4 texelFetchOffset(gsampler2D, ivec2, int, ivec2)",
    "gvec4 texelFetchOffset(gsampler3D, ivec3, int, ivec3)",
    "gvec4 textureGrad(gsampler2D, vec2, vec2, vec2)",
    "gvec4 textureGrad(gsampler3D, vec3, vec3, vec3)",
    "gvec4 textureGrad(gsamplerCube, vec3, vec3, vec3)",
    "gvec4 textureGrad(gsampler2DArray, vec3, vec2, vec2)",
    "float textureGrad(sampler2DShadow, vec3, vec2, vec2)",
    "gvec4 textureGather(gsampler2D, vec2)",
    "gvec4 textureGather(gsampler2D, vec2, int)",
    "gvec4 textureGather(gsampler2DArray, vec3)",
    "gvec4 textureGather(gsamplerCube, vec3)",
    "vec4 textureGather(sampler2DShadow, vec2, float)",
    "gvec4 textureGatherOffset(gsampler2D, vec2, ivec2)",
    // Compatibility-profile lookups
    "vec4 texture1D(sampler1D, float)",
    "vec4 texture2D(sampler2D, vec2)",
    "vec4 texture2D(sampler2D, vec2, float)",
    "vec4 texture2DProj(sampler2D, vec3)",
    "vec4 texture2DProj(sampler2D, vec4)",
    "vec4 texture2DLod(sampler2D, vec2, float)",
    "vec4 texture3D(sampler3D, vec3)",
    "vec4 textureCube(samplerCube, vec3)",
    "vec4 textureCubeLod(samplerCube, vec3, float)",
    "vec4 shadow2D(sampler2DShadow, vec3)",
    // Images
    "gvec4 imageLoad(gimage1D, int)",
    "gvec4 imageLoad(gimage2D, ivec2)",
    "gvec4 imageLoad(gimage3D, ivec3)",
    "gvec4 imageLoad(gimage2DArray, ivec3)",
    "gvec4 imageLoad(gimageCube, ivec3)",
    "gvec4 imageLoad(gimageBuffer, int)",
    "void imageStore(gimage1D, int, gvec4)",
    "void imageStore(gimage2D, ivec2, gvec4)",
    "void imageStore(gimage3D, ivec3, gvec4)",
    "void imageStore(gimage2DArray, ivec3, gvec4)",
    "void imageStore(gimageCube, ivec3, gvec4)",
    "void imageStore(gimageBuffer, int, gvec4)",
    "int imageSize(gimage1D)",
    "ivec2 imageSize(gimage2D)",
    "ivec3 imageSize(gimage3D)",
    "ivec3 imageSize(gimage2DArray)",
    "ivec2 imageSize(gimageCube)",
    "int imageSize(gimageBuffer)",
    "uint imageAtomicAdd(uimage2D, ivec2, uint)",
    "int imageAtomicAdd(iimage2D, ivec2, int)",
    "uint imageAtomicMin(uimage2D, ivec2, uint)",
    "int imageAtomicMin(iimage2D, ivec2, int)",
    "uint imageAtomicMax(uimage2D, ivec2, uint)",
    "int imageAtomicMax(iimage2D, ivec2, int)",
    "uint imageAtomicExchange(uimage2D, ivec2, uint)",
    "int imageAtomicExchange(iimage2D, ivec2, int)",
    "uint imageAtomicCompSwap(uimage2D, ivec2, uint, uint)",
    "int imageAtomicCompSwap(iimage2D, ivec2, int, int)",
    // Atomics
    "uint atomicAdd(inout uint, uint)",
    "int atomicAdd(inout int, int)",
    "uint atomicMin(inout uint, uint)",
    "int atomicMin(inout int, int)",
    "uint atomicMax(inout uint, uint)",
    "int atomicMax(inout int, int)",
    "uint atomicAnd(inout uint, uint)",
    "int atomicAnd(inout int, int)",
    "uint atomicOr(inout uint, uint)",
    "int atomicOr(inout int, int)",
    "uint atomicXor(inout uint, uint)",
    "int atomicXor(inout int, int)",
    "uint atomicExchange(inout uint, uint)",
    "int atomicExchange(inout int, int)",
    "uint atomicCompSwap(inout uint, uint, uint)",
    "int atomicCompSwap(inout int, int, int)",
    "uint atomicCounterIncrement(atomic_uint)",
    "uint atomicCounterDecrement(atomic_uint)",
    "uint atomicCounter(atomic_uint)",
    // Fragment processing
    "genFType dFdx(genFType)",
    "genFType dFdy(genFType)",
    "genFType dFdxFine(genFType)",
    "genFType dFdyFine(genFType)",
    "genFType dFdxCoarse(genFType)",
    "genFType dFdyCoarse(genFType)",
    "genFType fwidth(genFType)",
    "genFType fwidthFine(genFType)",
    "genFType fwidthCoarse(genFType)",
    "genFType interpolateAtCentroid(genFType)",
    "genFType interpolateAtSample(genFType, int)",
    "genFType interpolateAtOffset(genFType, vec2)",
    // Geometry shader
    "void EmitVertex()",
    "void EndPrimitive()",
    "void EmitStreamVertex(int)",
    "void EndStreamPrimitive(int)",
    // Synchronization
    "void barrier()",
    "void memoryBarrier()",
    "void memoryBarrierAtomicCounter()",
    "void memoryBarrierBuffer()",
    "void memoryBarrierShared()",
    "void memoryBarrierImage()",
    "void groupMemoryBarrier()",
];

/// `[qualifier] type name[array]`; `in` and `const` make the variable read-only.
const VARIABLES: &[&str] = &[
    // Vertex
    "in int gl_VertexID",
    "in int gl_InstanceID",
    "in int gl_VertexIndex",
    "in int gl_InstanceIndex",
    "in int gl_DrawID",
    "in int gl_BaseVertex",
    "in int gl_BaseInstance",
    "vec4 gl_Position",
    "float gl_PointSize",
    "float gl_ClipDistance[]",
    "float gl_CullDistance[]",
    // Tessellation and geometry
    "in gl_PerVertex gl_in[]",
    "in int gl_PatchVerticesIn",
    "in int gl_PrimitiveID",
    "in int gl_PrimitiveIDIn",
    "in int gl_InvocationID",
    "float gl_TessLevelOuter[4]",
    "float gl_TessLevelInner[2]",
    "in vec3 gl_TessCoord",
    "int gl_Layer",
    "int gl_ViewportIndex",
    // Fragment
    "in vec4 gl_FragCoord",
    "in bool gl_FrontFacing",
    "in vec2 gl_PointCoord",
    "in int gl_SampleID",
    "in vec2 gl_SamplePosition",
    "in int gl_SampleMaskIn[]",
    "in bool gl_HelperInvocation",
    "int gl_SampleMask[]",
    "float gl_FragDepth",
    "vec4 gl_FragColor",
    "vec4 gl_FragData[]",
    // Compute
    "in uvec3 gl_NumWorkGroups",
    "const uvec3 gl_WorkGroupSize",
    "in uvec3 gl_WorkGroupID",
    "in uvec3 gl_LocalInvocationID",
    "in uvec3 gl_GlobalInvocationID",
    "in uint gl_LocalInvocationIndex",
    // Implementation limits
    "const int gl_MaxVertexAttribs",
    "const int gl_MaxVertexUniformComponents",
    "const int gl_MaxFragmentUniformComponents",
    "const int gl_MaxTextureImageUnits",
    "const int gl_MaxCombinedTextureImageUnits",
    "const int gl_MaxDrawBuffers",
    "const int gl_MaxClipDistances",
    "const ivec3 gl_MaxComputeWorkGroupCount",
    "const ivec3 gl_MaxComputeWorkGroupSize",
];

#[derive(Debug, Clone)]
pub struct BuiltinVariable {
    pub name: String,
    pub ty: Type,
    pub read_only: bool,
}

/// The expanded built-in tables.
#[derive(Debug, Default)]
pub struct Builtins {
    functions: HashMap<String, Vec<Arc<FunctionSignature>>>,
    variables: HashMap<String, BuiltinVariable>,
}

impl Builtins {
    pub fn functions(&self, name: &str) -> &[Arc<FunctionSignature>] {
        self.functions.get(name).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn is_function(&self, name: &str) -> bool {
        self.functions.contains_key(name)
    }

    pub fn variable(&self, name: &str) -> Option<&BuiltinVariable> {
        self.variables.get(name)
    }

    /// All function names, sorted.
    pub fn function_names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.functions.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }

    /// All variables, sorted by name.
    pub fn variables(&self) -> Vec<&BuiltinVariable> {
        let mut vars: Vec<&BuiltinVariable> = self.variables.values().collect();
        vars.sort_by(|a, b| a.name.cmp(&b.name));
        vars
    }

    fn build() -> Self {
        let mut builtins = Builtins::default();
        for template in FUNCTIONS {
            let expanded = expand(template);
            if expanded.is_empty() {
                tracing::warn!(template, "skipping malformed built-in signature");
            }
            for signature in expanded {
                let overloads = builtins.functions.entry(signature.name.clone()).or_default();
                if !overloads.iter().any(|o| o.same_parameters(&signature)) {
                    overloads.push(Arc::new(signature));
                }
            }
        }
        for line in VARIABLES {
            match parse_variable(line) {
                Some(var) => {
                    builtins.variables.insert(var.name.clone(), var);
                }
                None => tracing::warn!(line, "skipping malformed built-in variable"),
            }
        }
        tracing::debug!(
            functions = builtins.functions.len(),
            variables = builtins.variables.len(),
            "built-in tables initialized"
        );
        builtins
    }
}

static BUILTINS: OnceLock<Builtins> = OnceLock::new();

/// The process-wide built-in tables, built on first access.
pub fn builtins() -> &'static Builtins {
    BUILTINS.get_or_init(Builtins::build)
}

/// How generic names in one prototype are instantiated. All generic names in
/// a prototype move together, so `genFType ldexp(genFType, genIType)` yields
/// `vec3 ldexp(vec3, ivec3)` but never `vec3 ldexp(vec3, ivec2)`.
#[derive(Clone, Copy)]
enum Instance {
    Size(u8),
    Matrix(u8, u8),
    Prefix(&'static str),
}

const MATRIX_SHAPES: &[(u8, u8)] = &[
    (2, 2),
    (3, 3),
    (4, 4),
    (2, 3),
    (2, 4),
    (3, 2),
    (3, 4),
    (4, 2),
    (4, 3),
];

fn substitute(word: &str, instance: Instance) -> String {
    match instance {
        Instance::Size(n) => {
            let scalar = match word {
                "genFType" => Some(("float", "vec")),
                "genDType" => Some(("double", "dvec")),
                "genIType" => Some(("int", "ivec")),
                "genUType" => Some(("uint", "uvec")),
                "genBType" => Some(("bool", "bvec")),
                _ => None,
            };
            match scalar {
                Some((scalar, _)) if n == 1 => scalar.to_string(),
                Some((_, vector)) => format!("{vector}{n}"),
                None if matches!(word, "vec" | "dvec" | "ivec" | "uvec" | "bvec") => {
                    format!("{word}{n}")
                }
                None => word.to_string(),
            }
        }
        Instance::Matrix(cols, rows) if matches!(word, "mat" | "dmat") => {
            if cols == rows {
                format!("{word}{cols}")
            } else {
                format!("{word}{cols}x{rows}")
            }
        }
        Instance::Matrix(..) => word.to_string(),
        Instance::Prefix(prefix) => match word.strip_prefix('g') {
            Some(rest)
                if rest == "vec4" || rest.starts_with("sampler") || rest.starts_with("image") =>
            {
                format!("{prefix}{rest}")
            }
            _ => word.to_string(),
        },
    }
}

fn instances(words: &[&str]) -> Vec<Instance> {
    let any = |pred: fn(&str) -> bool| words.iter().any(|w| pred(w));
    if any(|w| w.starts_with("gen")) {
        (1..=4).map(Instance::Size).collect()
    } else if any(|w| matches!(w, "vec" | "dvec" | "ivec" | "uvec" | "bvec")) {
        (2..=4).map(Instance::Size).collect()
    } else if any(|w| matches!(w, "mat" | "dmat")) {
        MATRIX_SHAPES.iter().map(|&(c, r)| Instance::Matrix(c, r)).collect()
    } else if any(|w| w == "gvec4" || w.starts_with("gsampler") || w.starts_with("gimage")) {
        ["", "i", "u"].into_iter().map(Instance::Prefix).collect()
    } else {
        vec![Instance::Size(1)]
    }
}

struct Template<'a> {
    return_type: &'a str,
    name: &'a str,
    params: Vec<(ParamDirection, &'a str)>,
}

fn parse_template(text: &str) -> Option<Template<'_>> {
    let (head, rest) = text.split_once('(')?;
    let params_text = rest.strip_suffix(')')?;
    let (return_type, name) = head.trim().split_once(' ')?;
    let mut params = Vec::new();
    for param in params_text.split(',').map(str::trim).filter(|p| !p.is_empty()) {
        let (direction, ty) = if let Some(ty) = param.strip_prefix("out ") {
            (ParamDirection::Out, ty)
        } else if let Some(ty) = param.strip_prefix("inout ") {
            (ParamDirection::InOut, ty)
        } else {
            (ParamDirection::In, param)
        };
        params.push((direction, ty.trim()));
    }
    Some(Template {
        return_type: return_type.trim(),
        name: name.trim(),
        params,
    })
}

/// Expand one generic prototype into concrete signatures.
fn expand(text: &str) -> Vec<FunctionSignature> {
    let Some(template) = parse_template(text) else {
        return Vec::new();
    };
    let mut words = vec![template.return_type];
    words.extend(template.params.iter().map(|(_, ty)| *ty));

    let mut out = Vec::new();
    for instance in instances(&words) {
        let resolve = |word: &str| Type::from_name(&substitute(word, instance));
        let Some(return_type) = resolve(template.return_type) else {
            return Vec::new();
        };
        let mut params = Vec::with_capacity(template.params.len());
        for (direction, ty) in &template.params {
            let Some(ty) = resolve(ty) else {
                return Vec::new();
            };
            params.push(ParamType {
                ty,
                direction: *direction,
            });
        }
        out.push(FunctionSignature {
            name: template.name.to_string(),
            params,
            return_type,
        });
    }
    out
}

fn per_vertex() -> Type {
    let field = |name: &str, ty: Type| StructField {
        name: name.to_string(),
        ty,
    };
    Type::Struct(Arc::new(StructType {
        name: "gl_PerVertex".to_string(),
        fields: vec![
            field("gl_Position", Type::Vector(ScalarKind::Float, 4)),
            field("gl_PointSize", Type::FLOAT),
            field("gl_ClipDistance", Type::array_of(Type::FLOAT, None)),
            field("gl_CullDistance", Type::array_of(Type::FLOAT, None)),
        ],
    }))
}

fn parse_variable(line: &str) -> Option<BuiltinVariable> {
    let mut words: Vec<&str> = line.split_whitespace().collect();
    let read_only = match words.first() {
        Some(&"in") | Some(&"const") => {
            words.remove(0);
            true
        }
        _ => false,
    };
    let &[ty_name, declarator] = words.as_slice() else {
        return None;
    };
    let base = if ty_name == "gl_PerVertex" {
        per_vertex()
    } else {
        Type::from_name(ty_name)?
    };
    let (name, ty) = match declarator.split_once('[') {
        Some((name, size)) => {
            let size = size.strip_suffix(']')?;
            let len = if size.is_empty() {
                None
            } else {
                Some(size.parse().ok()?)
            };
            (name, Type::array_of(base, len))
        }
        None => (declarator, base),
    };
    Some(BuiltinVariable {
        name: name.to_string(),
        ty,
        read_only,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_every_entry_expands() {
        for template in FUNCTIONS {
            assert!(!expand(template).is_empty(), "bad template: {template}");
        }
        for line in VARIABLES {
            assert!(parse_variable(line).is_some(), "bad variable: {line}");
        }
    }

    #[test]
    fn test_gen_types_move_together() {
        let sigs = expand("genFType ldexp(genFType, genIType)");
        assert_eq!(sigs.len(), 4);
        assert_eq!(sigs[2].to_string(), "vec3 ldexp(vec3, ivec3)");
        assert_eq!(sigs[0].to_string(), "float ldexp(float, int)");
    }

    #[test]
    fn test_sampler_prefix_expansion() {
        let sigs = expand("gvec4 texture(gsampler2D, vec2)");
        let rendered: Vec<String> = sigs.iter().map(|s| s.to_string()).collect();
        assert_eq!(
            rendered,
            [
                "vec4 texture(sampler2D, vec2)",
                "ivec4 texture(isampler2D, vec2)",
                "uvec4 texture(usampler2D, vec2)",
            ]
        );
    }

    #[test]
    fn test_out_parameters() {
        let sigs = expand("genFType modf(genFType, out genFType)");
        assert_eq!(sigs[0].params[1].direction, ParamDirection::Out);
    }

    #[test]
    fn test_table_lookup() {
        let table = builtins();
        assert_eq!(table.functions("dot").len(), 8);
        assert!(table.functions("nonexistent").is_empty());
        assert_eq!(table.functions("cross").len(), 2);

        let pos = table.variable("gl_Position").unwrap();
        assert_eq!(pos.ty, Type::Vector(ScalarKind::Float, 4));
        assert!(!pos.read_only);
        assert!(table.variable("gl_FragCoord").unwrap().read_only);
        assert!(matches!(
            table.variable("gl_in").unwrap().ty,
            Type::Array(_, None)
        ));
    }

    #[test]
    fn test_compute_limits_are_vectors() {
        let table = builtins();
        for name in ["gl_MaxComputeWorkGroupCount", "gl_MaxComputeWorkGroupSize"] {
            let var = table.variable(name).unwrap();
            assert_eq!(var.ty, Type::Vector(ScalarKind::Int, 3), "{name}");
            assert!(var.read_only);
        }
        assert_eq!(
            table.variable("gl_WorkGroupSize").unwrap().ty,
            Type::Vector(ScalarKind::Uint, 3)
        );
    }

    #[test]
    fn test_table_is_shared() {
        assert!(std::ptr::eq(builtins(), builtins()));
        let handle = std::thread::spawn(|| builtins() as *const Builtins as usize);
        assert_eq!(handle.join().unwrap(), builtins() as *const Builtins as usize);
    }
}
