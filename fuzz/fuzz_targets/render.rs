#![no_main]
use std::collections::BTreeMap;

use arbitrary::Arbitrary;
use libfuzzer_sys::fuzz_target;
use serde::Serialize;

#[derive(Debug, Serialize, Arbitrary)]
#[serde(untagged)]
enum Value {
    None,
    Bool(bool),
    Integer(i64),
    Float(f64),
    String(String),
    List(Vec<Value>),
    Map(BTreeMap<String, Value>),
}

fuzz_target!(|data: (&str, BTreeMap<String, Value>)| {
    let (source, vars) = data;

    let mut env = minitpl::Environment::new();
    env.set_fuel(Some(10000));

    let mut ctx = match minitpl::Context::from_serialize(&vars) {
        Ok(ctx) => ctx,
        Err(_) => return,
    };
    env.render_str(source, &mut ctx).ok();
});
