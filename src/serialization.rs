// SPDX-License-Identifier: LGPL-2.1-or-later
// See Notices.txt for copyright information

use crate::arf::Arf;
use crate::element::Element;
use crate::error::{ConstructionError, Error, Result};
use crate::module::Module;
use crate::number_field::NumberField;
use crate::polynomial::Polynomial;
use crate::real_number::{RealNumber, RealNumberKind};
use crate::registry::Registry;
use crate::ring::{CoefficientRing, IntegerRing, RationalField};
use num_bigint::BigInt;
use num_rational::BigRational;
use serde_json::{json, Map, Value};
use std::collections::HashMap;
use std::convert::TryFrom;
use std::str::FromStr;

/// marks the first occurrence of a shared object
const FRESH: u32 = 0x8000_0000;

/// a coefficient ring that can be written to and read from an archive
pub trait ArchiveRing: CoefficientRing {
    fn save_ring(&self, writer: &mut Writer<Self>) -> Value;
    fn load_ring(value: &Value, reader: &mut Reader<Self>) -> Result<Self>;
    fn save_coefficient(&self, value: &Self::Element) -> Value;
    fn load_coefficient(&self, value: &Value) -> Result<Self::Element>;
}

/// the state of one archive being written
pub struct Writer<R: CoefficientRing> {
    next: u32,
    /// keyed by identity, ids alone are only unique within one registry
    reals: HashMap<RealNumber, u32>,
    modules: HashMap<Module<R>, u32>,
    fields: Vec<(NumberField, u32)>,
}

/// the state of one archive being read
pub struct Reader<'a, R: CoefficientRing> {
    registry: &'a Registry,
    reals: HashMap<u32, RealNumber>,
    /// modules with the basis in archive order
    modules: HashMap<u32, (Module<R>, Vec<RealNumber>)>,
    fields: HashMap<u32, NumberField>,
}

enum Shared {
    Fresh(u32),
    Reference(u32),
}

fn field<'v>(value: &'v Value, name: &str) -> Result<&'v Value> {
    value
        .get(name)
        .ok_or_else(|| Error::archive(format!("missing field {:?}", name)))
}

fn array<'v>(value: &'v Value, name: &str) -> Result<&'v Vec<Value>> {
    field(value, name)?
        .as_array()
        .ok_or_else(|| Error::archive(format!("field {:?} must be an array", name)))
}

fn string(value: &Value) -> Result<&str> {
    value
        .as_str()
        .ok_or_else(|| Error::archive(format!("expected a string, got {}", value)))
}

fn parse<T: FromStr>(value: &Value) -> Result<T> {
    let text = string(value)?;
    text.parse()
        .map_err(|_| Error::archive(format!("malformed number {:?}", text)))
}

fn integer<T: TryFrom<i64>>(value: &Value, name: &str) -> Result<T> {
    field(value, name)?
        .as_i64()
        .and_then(|value| T::try_from(value).ok())
        .ok_or_else(|| Error::archive(format!("field {:?} must be a small integer", name)))
}

fn shared(value: &Value) -> Result<Shared> {
    let tag = field(value, "shared")?
        .as_u64()
        .and_then(|tag| u32::try_from(tag).ok())
        .ok_or_else(|| Error::archive("malformed shared id"))?;
    Ok(if tag & FRESH != 0 {
        Shared::Fresh(tag & !FRESH)
    } else {
        Shared::Reference(tag)
    })
}

fn unknown(id: u32) -> Error {
    Error::archive(format!("reference to unknown shared id {}", id))
}

fn save_arf(value: &Arf) -> Value {
    json!({
        "mantissa": value.mantissa().to_string(),
        "exponent": value.exponent(),
        "approximation": value.to_f64(),
    })
}

fn load_arf(value: &Value) -> Result<Arf> {
    let mantissa: BigInt = parse(field(value, "mantissa")?)?;
    Ok(Arf::new(mantissa, integer(value, "exponent")?))
}

fn save_rationals<'a>(values: impl IntoIterator<Item = &'a BigRational>) -> Value {
    values
        .into_iter()
        .map(|value| Value::String(value.to_string()))
        .collect()
}

fn load_rationals(values: &[Value]) -> Result<Vec<BigRational>> {
    values.iter().map(parse).collect()
}

impl<R: CoefficientRing> Writer<R> {
    fn new() -> Self {
        Writer {
            next: 1,
            reals: HashMap::new(),
            modules: HashMap::new(),
            fields: Vec::new(),
        }
    }
    fn register(&mut self) -> u32 {
        let id = self.next;
        self.next += 1;
        id
    }
    fn save_real(&mut self, real: &RealNumber) -> Value {
        if let Some(id) = self.reals.get(real) {
            return json!({ "shared": id });
        }
        let id = self.register();
        self.reals.insert(real.clone(), id);
        let mut object = Map::new();
        object.insert("shared".into(), json!(id | FRESH));
        match real.kind() {
            RealNumberKind::Rational(value) => {
                object.insert("kind".into(), json!("rational"));
                object.insert("value".into(), json!(value.to_string()));
            }
            RealNumberKind::Random { seed } => {
                object.insert("kind".into(), json!("random"));
                object.insert("seed".into(), json!(seed));
            }
            RealNumberKind::Constrained { initial, e, inner } => {
                object.insert("kind".into(), json!("constrained"));
                object.insert("initial".into(), save_arf(initial));
                object.insert("e".into(), json!(e));
                object.insert("inner".into(), self.save_real(inner));
            }
            RealNumberKind::Product { factors } => {
                object.insert("kind".into(), json!("product"));
                let factors = factors
                    .iter()
                    .map(|(factor, exponent)| {
                        json!({ "key": self.save_real(factor), "value": exponent })
                    })
                    .collect();
                object.insert("factors".into(), Value::Array(factors));
            }
        }
        Value::Object(object)
    }
    fn save_field(&mut self, field: &NumberField) -> Value {
        if let Some((_, id)) = self.fields.iter().find(|(known, _)| known.ptr_eq(field)) {
            return json!({ "shared": id });
        }
        let id = self.register();
        self.fields.push((field.clone(), id));
        let (lower, upper) = field.embedding();
        json!({
            "shared": id | FRESH,
            "name": field.name(),
            "minpoly": save_rationals(field.minpoly().iter()),
            "embedding": save_rationals(&[lower, upper]),
        })
    }
}

impl<R: ArchiveRing> Writer<R> {
    fn save_module(&mut self, module: &Module<R>) -> Value {
        if let Some(id) = self.modules.get(module) {
            return json!({ "shared": id });
        }
        let id = self.register();
        self.modules.insert(module.clone(), id);
        let basis: Vec<Value> = module
            .basis()
            .iter()
            .map(|gen| self.save_real(gen))
            .collect();
        let ring = module.ring().save_ring(self);
        json!({
            "shared": id | FRESH,
            "basis": basis,
            "ring": ring,
        })
    }
    fn save_element(&mut self, element: &Element<R>) -> Value {
        let parent = self.save_module(element.module());
        let ring = element.ring();
        let coefficients: Vec<Value> = element
            .coefficients()
            .iter()
            .map(|coefficient| ring.save_coefficient(coefficient))
            .collect();
        json!({
            "parent": parent,
            "coefficients": coefficients,
        })
    }
}

impl<'a, R: CoefficientRing> Reader<'a, R> {
    fn new(registry: &'a Registry) -> Self {
        Reader {
            registry,
            reals: HashMap::new(),
            modules: HashMap::new(),
            fields: HashMap::new(),
        }
    }
    fn load_real(&mut self, value: &Value) -> Result<RealNumber> {
        let id = match shared(value)? {
            Shared::Reference(id) => return self.reals.get(&id).cloned().ok_or_else(|| unknown(id)),
            Shared::Fresh(id) => id,
        };
        let registry = self.registry;
        let real = match string(field(value, "kind")?)? {
            "rational" => RealNumber::rational(registry, parse(field(value, "value")?)?),
            "random" => {
                let seed = field(value, "seed")?
                    .as_u64()
                    .ok_or_else(|| Error::archive("seed must be an unsigned integer"))?;
                RealNumber::random_with_seed(registry, seed)
            }
            "constrained" => {
                let initial = load_arf(field(value, "initial")?)?;
                let e = integer(value, "e")?;
                let inner = self.load_real(field(value, "inner")?)?;
                RealNumber::constrained(registry, initial, e, inner)?
            }
            "product" => {
                let factors = array(value, "factors")?
                    .iter()
                    .map(|factor| {
                        let real = self.load_real(field(factor, "key")?)?;
                        Ok((real, integer(factor, "value")?))
                    })
                    .collect::<Result<Vec<(RealNumber, u32)>>>()?;
                RealNumber::product(registry, factors)
            }
            kind => {
                return Err(Error::archive(format!(
                    "unknown kind of real number {:?}",
                    kind
                )))
            }
        };
        self.reals.insert(id, real.clone());
        Ok(real)
    }
    fn load_field(&mut self, value: &Value) -> Result<NumberField> {
        let id = match shared(value)? {
            Shared::Reference(id) => return self.fields.get(&id).cloned().ok_or_else(|| unknown(id)),
            Shared::Fresh(id) => id,
        };
        let name = string(field(value, "name")?)?;
        let minpoly = load_rationals(array(value, "minpoly")?)?;
        let embedding = load_rationals(array(value, "embedding")?)?;
        let (lower, upper) = match embedding.as_slice() {
            [lower, upper] => (lower.clone(), upper.clone()),
            _ => return Err(Error::archive("embedding must be an interval")),
        };
        let number_field = NumberField::new(Polynomial::from(minpoly), name, lower, upper)?;
        self.fields.insert(id, number_field.clone());
        Ok(number_field)
    }
}

impl<'a, R: ArchiveRing> Reader<'a, R> {
    fn load_module(&mut self, value: &Value) -> Result<(Module<R>, Vec<RealNumber>)> {
        let id = match shared(value)? {
            Shared::Reference(id) => return self.modules.get(&id).cloned().ok_or_else(|| unknown(id)),
            Shared::Fresh(id) => id,
        };
        let basis = array(value, "basis")?
            .iter()
            .map(|gen| self.load_real(gen))
            .collect::<Result<Vec<_>>>()?;
        let ring = R::load_ring(field(value, "ring")?, self)?;
        let module = Module::make(basis.clone(), ring, self.registry)?;
        self.modules.insert(id, (module.clone(), basis.clone()));
        Ok((module, basis))
    }
    fn load_element(&mut self, value: &Value) -> Result<Element<R>> {
        let (module, archived) = self.load_module(field(value, "parent")?)?;
        let coefficients = array(value, "coefficients")?;
        if coefficients.len() != archived.len() {
            return Err(ConstructionError::CoefficientCountMismatch {
                expected: archived.len(),
                actual: coefficients.len(),
            }
            .into());
        }
        let ring = module.ring();
        let mut ordered = vec![ring.zero(); module.rank()];
        for (gen, coefficient) in archived.iter().zip(coefficients) {
            let index = module
                .index_of(gen)
                .ok_or_else(|| Error::archive("generator missing from its module"))?;
            ordered[index] = ring.load_coefficient(coefficient)?;
        }
        Element::new(&module, ordered)
    }
}

impl ArchiveRing for IntegerRing {
    fn save_ring(&self, _writer: &mut Writer<Self>) -> Value {
        json!({})
    }
    fn load_ring(_value: &Value, _reader: &mut Reader<Self>) -> Result<Self> {
        Ok(IntegerRing)
    }
    fn save_coefficient(&self, value: &BigInt) -> Value {
        Value::String(value.to_string())
    }
    fn load_coefficient(&self, value: &Value) -> Result<BigInt> {
        parse(value)
    }
}

impl ArchiveRing for RationalField {
    fn save_ring(&self, _writer: &mut Writer<Self>) -> Value {
        json!({})
    }
    fn load_ring(_value: &Value, _reader: &mut Reader<Self>) -> Result<Self> {
        Ok(RationalField)
    }
    fn save_coefficient(&self, value: &BigRational) -> Value {
        Value::String(value.to_string())
    }
    fn load_coefficient(&self, value: &Value) -> Result<BigRational> {
        parse(value)
    }
}

impl ArchiveRing for NumberField {
    fn save_ring(&self, writer: &mut Writer<Self>) -> Value {
        json!({ "field": writer.save_field(self) })
    }
    fn load_ring(value: &Value, reader: &mut Reader<Self>) -> Result<Self> {
        reader.load_field(field(value, "field")?)
    }
    fn save_coefficient(&self, value: &Self::Element) -> Value {
        save_rationals(&self.rational_coefficients(value))
    }
    fn load_coefficient(&self, value: &Value) -> Result<Self::Element> {
        let coefficients = value
            .as_array()
            .ok_or_else(|| Error::archive("number field element must be an array"))?;
        Ok(self.element(Polynomial::from(load_rationals(coefficients)?)))
    }
}

fn write(value: &Value) -> Result<String> {
    let text = serde_json::to_string_pretty(value)?;
    tracing::debug!(bytes = text.len(), "wrote archive");
    Ok(text)
}

fn read(text: &str) -> Result<Value> {
    let value = serde_json::from_str(text)?;
    tracing::debug!(bytes = text.len(), "read archive");
    Ok(value)
}

pub fn to_json<R: ArchiveRing>(element: &Element<R>) -> Result<String> {
    write(&Writer::new().save_element(element))
}

/// one archive for all `elements`, shared objects are written once
pub fn to_json_many<R: ArchiveRing>(elements: &[Element<R>]) -> Result<String> {
    let mut writer = Writer::new();
    let values: Vec<Value> = elements
        .iter()
        .map(|element| writer.save_element(element))
        .collect();
    write(&Value::Array(values))
}

pub fn from_json<R: ArchiveRing>(registry: &Registry, text: &str) -> Result<Element<R>> {
    Reader::new(registry).load_element(&read(text)?)
}

pub fn from_json_many<R: ArchiveRing>(registry: &Registry, text: &str) -> Result<Vec<Element<R>>> {
    let value = read(text)?;
    let values = value
        .as_array()
        .ok_or_else(|| Error::archive("expected an array of elements"))?;
    let mut reader = Reader::new(registry);
    values
        .iter()
        .map(|value| reader.load_element(value))
        .collect()
}

pub fn module_to_json<R: ArchiveRing>(module: &Module<R>) -> Result<String> {
    write(&Writer::new().save_module(module))
}

pub fn module_from_json<R: ArchiveRing>(registry: &Registry, text: &str) -> Result<Module<R>> {
    let (module, _) = Reader::new(registry).load_module(&read(text)?)?;
    Ok(module)
}

pub fn real_to_json(real: &RealNumber) -> Result<String> {
    write(&Writer::<IntegerRing>::new().save_real(real))
}

pub fn real_from_json(registry: &Registry, text: &str) -> Result<RealNumber> {
    Reader::<IntegerRing>::new(registry).load_real(&read(text)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::PrecisionPolicy;
    use crate::module::{number_field_module, qq_module, zz_module};

    fn registry() -> Registry {
        Registry::with_policy(PrecisionPolicy::default())
    }

    fn r(n: i64, d: i64) -> BigRational {
        BigRational::new(BigInt::from(n), BigInt::from(d))
    }

    fn sample(registry: &Registry) -> (Element<IntegerRing>, Element<IntegerRing>) {
        let one = RealNumber::integer(registry, 1);
        let x = RealNumber::random(registry);
        let y = RealNumber::random(registry);
        let module = zz_module(registry, vec![one, x, y]).unwrap();
        let a = &module.gen(1) + &module.gen(0).scale(&BigInt::from(2));
        let b = &module.gen(2) - &module.gen(1);
        (a, b)
    }

    #[test]
    fn test_format() {
        let registry = registry();
        let (a, _) = sample(&registry);
        let value: Value = serde_json::from_str(&to_json(&a).unwrap()).unwrap();
        assert_eq!(value["parent"]["shared"], json!(2147483649u32));
        assert_eq!(value["parent"]["ring"], json!({}));
        let basis = value["parent"]["basis"].as_array().unwrap();
        assert_eq!(basis.len(), 3);
        assert_eq!(basis[0]["shared"], json!(2147483650u32));
        assert_eq!(basis[0]["kind"], json!("rational"));
        assert_eq!(basis[0]["value"], json!("1"));
        assert_eq!(basis[1]["kind"], json!("random"));
        assert_eq!(value["coefficients"], json!(["2", "1", "0"]));
    }

    #[test]
    fn test_round_trip_preserves_identity() {
        let registry = registry();
        let (a, b) = sample(&registry);
        let loaded: Element<IntegerRing> = from_json(&registry, &to_json(&a).unwrap()).unwrap();
        assert_eq!(loaded, a);
        assert!(loaded.module().ptr_eq(a.module()));
        let text = to_json_many(&[a.clone(), b.clone()]).unwrap();
        assert_eq!(text.matches("\"basis\"").count(), 1);
        let loaded = from_json_many::<IntegerRing>(&registry, &text).unwrap();
        assert_eq!(loaded, vec![a, b]);
        assert!(loaded[0].module().ptr_eq(loaded[1].module()));
    }

    #[test]
    fn test_round_trip_into_fresh_registry() {
        let registry = registry();
        let (a, b) = sample(&registry);
        let text = to_json_many(&[a.clone(), b.clone()]).unwrap();
        let other = Registry::with_policy(PrecisionPolicy::default());
        let loaded = from_json_many::<IntegerRing>(&other, &text).unwrap();
        assert_eq!(loaded[0].to_f64().unwrap(), a.to_f64().unwrap());
        assert_eq!(loaded[1].to_f64().unwrap(), b.to_f64().unwrap());
        assert!(loaded[0].module().ptr_eq(loaded[1].module()));
        assert_eq!(to_json_many(&loaded).unwrap(), text);
        let again: Element<IntegerRing> = from_json(&other, &to_json(&a).unwrap()).unwrap();
        assert!(again.module().ptr_eq(loaded[0].module()));
    }

    #[test]
    fn test_elements_of_several_registries() {
        let first = registry();
        let second = Registry::with_policy_and_seed(PrecisionPolicy::default(), 99);
        let x = zz_module(&first, vec![RealNumber::random(&first)]).unwrap().gen(0);
        let y = zz_module(&second, vec![RealNumber::random(&second)]).unwrap().gen(0);
        assert_eq!(x.module().basis()[0].id(), y.module().basis()[0].id());
        let text = to_json_many(&[x.clone(), y.clone()]).unwrap();
        assert_eq!(text.matches("\"basis\"").count(), 2);
        let other = registry();
        let loaded = from_json_many::<IntegerRing>(&other, &text).unwrap();
        assert_eq!(loaded[0].to_f64().unwrap(), x.to_f64().unwrap());
        assert_eq!(loaded[1].to_f64().unwrap(), y.to_f64().unwrap());
        assert!(!loaded[0].module().ptr_eq(loaded[1].module()));
    }

    #[test]
    fn test_coefficients_follow_archive_order() {
        let registry = registry();
        let text = r#"{
            "parent": {
                "shared": 2147483649,
                "basis": [
                    {"shared": 2147483650, "kind": "random", "seed": 7},
                    {"shared": 2147483651, "kind": "rational", "value": "1"}
                ],
                "ring": {}
            },
            "coefficients": ["5", "3"]
        }"#;
        let element: Element<IntegerRing> = from_json(&registry, text).unwrap();
        assert!(element.module().basis()[0].is_one());
        assert_eq!(
            element.coefficients(),
            &[BigInt::from(3), BigInt::from(5)][..]
        );
    }

    #[test]
    fn test_real_kinds() {
        let registry = registry();
        let x = RealNumber::random(&registry);
        let near = RealNumber::random_near(&registry, 1.5).unwrap();
        let product = x.checked_mul(&x).unwrap().checked_mul(&near).unwrap();
        let other = Registry::with_policy(PrecisionPolicy::default());
        for real in &[x.clone(), near.clone(), product.clone()] {
            let text = real_to_json(real).unwrap();
            assert!(real_from_json(&registry, &text).unwrap().ptr_eq(real));
            let loaded = real_from_json(&other, &text).unwrap();
            assert_eq!(loaded.to_f64(), real.to_f64());
            assert_eq!(loaded.to_string(), real.to_string());
        }
        let value: Value = serde_json::from_str(&real_to_json(&product).unwrap()).unwrap();
        assert_eq!(value["kind"], json!("product"));
        let factors = value["factors"].as_array().unwrap();
        assert_eq!(factors[0]["value"], json!(2));
        let value: Value = serde_json::from_str(&real_to_json(&near).unwrap()).unwrap();
        assert_eq!(value["kind"], json!("constrained"));
    }

    #[test]
    fn test_module_round_trip() {
        let registry = registry();
        let module = qq_module(
            &registry,
            vec![RealNumber::rational(&registry, r(1, 2)), RealNumber::random(&registry)],
        )
        .unwrap();
        let loaded: Module<RationalField> =
            module_from_json(&registry, &module_to_json(&module).unwrap()).unwrap();
        assert!(loaded.ptr_eq(&module));
    }

    #[test]
    fn test_number_field_round_trip() {
        let registry = registry();
        let field = NumberField::new(Polynomial::from_integers(&[-2, 0, 1]), "a", r(1, 1), r(2, 1))
            .unwrap();
        let real = RealNumber::random(&registry);
        let module = number_field_module(&field, &registry, vec![real]).unwrap();
        let element = module.gen(0).scale(&field.gen());
        let text = to_json_many(&[element.clone(), element.clone()]).unwrap();
        assert_eq!(text.matches("\"minpoly\"").count(), 1);
        let other = Registry::with_policy(PrecisionPolicy::default());
        let loaded = from_json_many::<NumberField>(&other, &text).unwrap();
        assert_eq!(loaded[0].ring(), &field);
        assert_eq!(loaded[0].coefficients()[0].value(), &Polynomial::x());
        assert_eq!(loaded[0].to_f64().unwrap(), element.to_f64().unwrap());
    }

    #[test]
    fn test_malformed_archives() {
        let registry = registry();
        let test_case = |text: &str| {
            let result = from_json::<IntegerRing>(&registry, text);
            assert!(matches!(result, Err(Error::Archive(_))), "{:?}", result);
        };
        test_case("{");
        test_case("{}");
        test_case(r#"{"parent": {"shared": 5}, "coefficients": []}"#);
        test_case(
            r#"{"parent": {"shared": 2147483649, "basis": [{"shared": 2147483650, "kind": "magic"}], "ring": {}}, "coefficients": ["1"]}"#,
        );
        test_case(
            r#"{"parent": {"shared": 2147483649, "basis": [{"shared": 2147483650, "kind": "rational", "value": "x"}], "ring": {}}, "coefficients": ["1"]}"#,
        );
        let mismatch = from_json::<IntegerRing>(
            &registry,
            r#"{"parent": {"shared": 2147483649, "basis": [], "ring": {}}, "coefficients": ["1"]}"#,
        );
        assert_eq!(
            mismatch.unwrap_err(),
            Error::from(ConstructionError::CoefficientCountMismatch {
                expected: 0,
                actual: 1
            })
        );
    }
}
