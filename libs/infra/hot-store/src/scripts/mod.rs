// [libs/infra/hot-store/src/scripts/mod.rs]
//! Compiles the three atomic scripts once at process startup. `redis::Script`
//! carries its own SHA1 digest and transparently retries with a full `EVAL`
//! when the server replies `NOSCRIPT`, recompiling on the fly.

use redis::Script;

pub struct ScriptSet {
    pub reserve: Script,
    pub deduct: Script,
    pub finalize: Script,
}

impl ScriptSet {
    pub fn compile() -> Self {
        Self {
            reserve: Script::new(include_str!("reserve.lua")),
            deduct: Script::new(include_str!("deduct.lua")),
            finalize: Script::new(include_str!("finalize.lua")),
        }
    }
}

impl Default for ScriptSet {
    fn default() -> Self {
        Self::compile()
    }
}
