// Small interpreter for generated code, enough to run test scripts
//
// Wide values take two stack words and two local slots, the second holding
// `Value::Top`, so the dup and pop family behave as on the real machine.

use std::collections::HashMap;

use scriptc::ast::{DataType, MethodRef};
use scriptc::codegen::{Arith, ArrayKind, Code, Cond, Kind, Label, Op};
use scriptc::common::{ScriptEnv, TypeEnv};

const STEP_LIMIT: usize = 100_000;

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Value {
    Int(i32),
    Long(i64),
    Float(f32),
    Double(f64),
    Null,
    Ref(usize),
    /// Return address pushed by `jsr`
    Addr(usize),
    /// Upper half of a wide value
    Top,
}

impl Value {
    fn is_wide(&self) -> bool {
        matches!(self, Value::Long(_) | Value::Double(_))
    }

    pub fn int(&self) -> i32 {
        match self {
            Value::Int(v) => *v,
            other => panic!("expected int, found {:?}", other),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Object {
    Str(String),
    Builder(String),
    Array(Vec<Value>),
    Instance { class: String, message: Option<String> },
}

/// How a run ended
#[derive(Debug, Clone, PartialEq)]
pub enum Outcome {
    Returned(Option<Value>),
    /// Uncaught exception, by class name
    Threw(String),
}

pub struct Vm<'a> {
    code: &'a Code,
    env: &'a ScriptEnv,
    heap: Vec<Object>,
    stack: Vec<Value>,
    locals: Vec<Value>,
    /// Calls to `Probe.hit` and `println`, in order
    pub log: Vec<String>,
    /// Monitor entries minus exits, per object
    pub monitors: HashMap<usize, i32>,
    /// Instance field values by object and field name
    fields: HashMap<(usize, String), Value>,
    /// Static field values stored by the script, by owner and name
    statics: HashMap<(String, String), Value>,
    pub flag: bool,
    pub value: i32,
}

enum Step {
    Next,
    Jump(usize),
    Return(Option<Value>),
    Throw(Value),
}

impl<'a> Vm<'a> {
    pub fn new(code: &'a Code, env: &'a ScriptEnv) -> Self {
        Self {
            code,
            env,
            heap: Vec::new(),
            stack: Vec::new(),
            locals: Vec::new(),
            log: Vec::new(),
            monitors: HashMap::new(),
            fields: HashMap::new(),
            statics: HashMap::new(),
            flag: false,
            value: 0,
        }
    }

    pub fn alloc(&mut self, object: Object) -> Value {
        self.heap.push(object);
        Value::Ref(self.heap.len() - 1)
    }

    pub fn string(&mut self, text: &str) -> Value {
        self.alloc(Object::Str(text.to_string()))
    }

    pub fn object(&mut self, class: &str) -> Value {
        self.alloc(Object::Instance {
            class: class.to_string(),
            message: None,
        })
    }

    pub fn heap(&self, value: Value) -> &Object {
        match value {
            Value::Ref(index) => &self.heap[index],
            other => panic!("expected reference, found {:?}", other),
        }
    }

    /// Text of a string value
    pub fn text(&self, value: Value) -> String {
        match self.heap(value) {
            Object::Str(text) => text.clone(),
            other => panic!("expected string, found {:?}", other),
        }
    }

    /// Run the method with `args` in the parameter slots
    pub fn run(&mut self, args: &[Value]) -> Outcome {
        self.locals = vec![Value::Top; usize::from(self.code.max_locals()).max(2 * args.len())];
        let mut slot = 0;
        for arg in args {
            self.locals[slot] = *arg;
            slot += if arg.is_wide() { 2 } else { 1 };
        }

        let mut pc = 0;
        for _ in 0..STEP_LIMIT {
            let op = match self.code.ops().get(pc) {
                Some(op) => op.clone(),
                None => panic!("fell off the end of the code at {}", pc),
            };
            match self.step(&op, pc) {
                Step::Next => pc += 1,
                Step::Jump(target) => pc = target,
                Step::Return(value) => return Outcome::Returned(value),
                Step::Throw(exception) => match self.handler_for(pc, exception) {
                    Some(target) => {
                        self.stack.clear();
                        self.stack.push(exception);
                        pc = target;
                    }
                    None => return Outcome::Threw(self.class_of(exception)),
                },
            }
        }
        panic!("step limit exceeded");
    }

    fn handler_for(&self, pc: usize, exception: Value) -> Option<usize> {
        let class = self.class_of(exception);
        self.code
            .handlers()
            .iter()
            .find(|h| {
                h.start <= pc
                    && pc < h.end
                    && h.catch_type
                        .as_ref()
                        .map_or(true, |catch| self.env.is_subclass(&class, &catch.replace('/', ".")))
            })
            .map(|h| self.pos(h.handler))
    }

    fn class_of(&self, value: Value) -> String {
        match self.heap(value) {
            Object::Str(_) => "java.lang.String".to_string(),
            Object::Builder(_) => "java.lang.StringBuilder".to_string(),
            Object::Array(_) => "[".to_string(),
            Object::Instance { class, .. } => class.clone(),
        }
    }

    fn pos(&self, label: Label) -> usize {
        self.code
            .label_pos(label)
            .unwrap_or_else(|| panic!("unbound label {}", label))
    }

    fn push(&mut self, value: Value) {
        self.stack.push(value);
        if value.is_wide() {
            self.stack.push(Value::Top);
        }
    }

    fn pop(&mut self) -> Value {
        match self.stack.pop() {
            Some(Value::Top) => self.stack.pop().expect("wide value"),
            Some(value) => value,
            None => panic!("stack underflow"),
        }
    }

    fn word(&mut self) -> Value {
        self.stack.pop().expect("stack underflow")
    }

    fn pop_int(&mut self) -> i32 {
        self.pop().int()
    }

    fn exception(&mut self, class: &str) -> Step {
        let value = self.object(class);
        Step::Throw(value)
    }

    fn step(&mut self, op: &Op, pc: usize) -> Step {
        match op {
            Op::Nop => {}
            Op::AconstNull => self.push(Value::Null),
            Op::Iconst(v) => self.push(Value::Int(*v)),
            Op::Lconst(v) => self.push(Value::Long(*v)),
            Op::Fconst(v) => self.push(Value::Float(*v)),
            Op::Dconst(v) => self.push(Value::Double(*v)),
            Op::Ldc(text) => {
                let value = self.string(text);
                self.push(value);
            }
            Op::Load(_, slot) => {
                let value = self.locals[usize::from(*slot)];
                self.push(value);
            }
            Op::Store(kind, slot) => {
                let value = if *kind == Kind::Ref { self.word() } else { self.pop() };
                self.locals[usize::from(*slot)] = value;
            }
            Op::Iinc(slot, by) => {
                let slot = usize::from(*slot);
                self.locals[slot] = Value::Int(self.locals[slot].int().wrapping_add(i32::from(*by)));
            }
            Op::ArrayLoad(_) => {
                let index = self.pop_int();
                let array = self.pop();
                if array == Value::Null {
                    return self.exception("java.lang.NullPointerException");
                }
                match self.heap(array) {
                    Object::Array(elems) => match usize::try_from(index).ok().and_then(|i| elems.get(i)) {
                        Some(value) => {
                            let value = *value;
                            self.push(value);
                        }
                        None => return self.exception("java.lang.ArrayIndexOutOfBoundsException"),
                    },
                    other => panic!("array load from {:?}", other),
                }
            }
            Op::ArrayStore(kind) => {
                let value = narrow_element(*kind, self.pop());
                let index = self.pop_int();
                let array = self.pop();
                if array == Value::Null {
                    return self.exception("java.lang.NullPointerException");
                }
                let Value::Ref(at) = array else { panic!("array store into {:?}", array) };
                match &mut self.heap[at] {
                    Object::Array(elems) => match usize::try_from(index).ok().and_then(|i| elems.get_mut(i)) {
                        Some(slot) => *slot = value,
                        None => return self.exception("java.lang.ArrayIndexOutOfBoundsException"),
                    },
                    other => panic!("array store into {:?}", other),
                }
            }
            Op::Pop => {
                self.word();
            }
            Op::Pop2 => {
                self.word();
                self.word();
            }
            Op::Dup => self.dup_words(1, 0),
            Op::DupX1 => self.dup_words(1, 1),
            Op::DupX2 => self.dup_words(1, 2),
            Op::Dup2 => self.dup_words(2, 0),
            Op::Dup2X1 => self.dup_words(2, 1),
            Op::Dup2X2 => self.dup_words(2, 2),
            Op::Swap => {
                let a = self.word();
                let b = self.word();
                self.stack.push(a);
                self.stack.push(b);
            }
            Op::Arith(kind, arith) => {
                let right = self.pop();
                let left = self.pop();
                match arithmetic(*kind, *arith, left, right) {
                    Some(value) => self.push(value),
                    None => return self.exception("java.lang.ArithmeticException"),
                }
            }
            Op::Neg(_) => {
                let value = match self.pop() {
                    Value::Int(v) => Value::Int(v.wrapping_neg()),
                    Value::Long(v) => Value::Long(v.wrapping_neg()),
                    Value::Float(v) => Value::Float(-v),
                    Value::Double(v) => Value::Double(-v),
                    other => panic!("neg of {:?}", other),
                };
                self.push(value);
            }
            Op::Convert(_, to) => {
                let value = self.pop();
                self.push(convert(value, *to));
            }
            Op::IntToByte => {
                let v = self.pop_int();
                self.push(Value::Int(i32::from(v as i8)));
            }
            Op::IntToChar => {
                let v = self.pop_int();
                self.push(Value::Int(i32::from(v as u16)));
            }
            Op::IntToShort => {
                let v = self.pop_int();
                self.push(Value::Int(i32::from(v as i16)));
            }
            Op::Lcmp | Op::Fcmpl | Op::Fcmpg | Op::Dcmpl | Op::Dcmpg => {
                let right = self.pop();
                let left = self.pop();
                let nan_result = if matches!(op, Op::Fcmpg | Op::Dcmpg) { 1 } else { -1 };
                let result = match (left, right) {
                    (Value::Long(a), Value::Long(b)) => a.cmp(&b) as i32,
                    (Value::Float(a), Value::Float(b)) => a.partial_cmp(&b).map_or(nan_result, |o| o as i32),
                    (Value::Double(a), Value::Double(b)) => a.partial_cmp(&b).map_or(nan_result, |o| o as i32),
                    other => panic!("compare of {:?}", other),
                };
                self.push(Value::Int(result));
            }
            Op::If(cond, label) => {
                let v = self.pop_int();
                if cond.test(v.cmp(&0)) {
                    return Step::Jump(self.pos(*label));
                }
            }
            Op::IfIcmp(cond, label) => {
                let right = self.pop_int();
                let left = self.pop_int();
                if cond.test(left.cmp(&right)) {
                    return Step::Jump(self.pos(*label));
                }
            }
            Op::IfAcmp(cond, label) => {
                let right = self.word();
                let left = self.word();
                let equal = left == right;
                if (*cond == Cond::Eq) == equal {
                    return Step::Jump(self.pos(*label));
                }
            }
            Op::IfNull(label) => {
                if self.word() == Value::Null {
                    return Step::Jump(self.pos(*label));
                }
            }
            Op::IfNonNull(label) => {
                if self.word() != Value::Null {
                    return Step::Jump(self.pos(*label));
                }
            }
            Op::Goto(label) => return Step::Jump(self.pos(*label)),
            Op::Jsr(label) => {
                self.stack.push(Value::Addr(pc + 1));
                return Step::Jump(self.pos(*label));
            }
            Op::Ret(slot) => match self.locals[usize::from(*slot)] {
                Value::Addr(target) => return Step::Jump(target),
                other => panic!("ret through {:?}", other),
            },
            Op::TableSwitch {
                low, default, targets, ..
            } => {
                let key = i64::from(self.pop_int()) - i64::from(*low);
                let label = usize::try_from(key)
                    .ok()
                    .and_then(|i| targets.get(i))
                    .copied()
                    .unwrap_or(*default);
                return Step::Jump(self.pos(label));
            }
            Op::LookupSwitch { default, pairs } => {
                let key = self.pop_int();
                let label = pairs
                    .iter()
                    .find(|(k, _)| *k == key)
                    .map_or(*default, |(_, label)| *label);
                return Step::Jump(self.pos(label));
            }
            Op::Return(None) => return Step::Return(None),
            Op::Return(Some(_)) => {
                let value = self.pop();
                return Step::Return(Some(value));
            }
            Op::GetStatic(field) => {
                let key = (field.owner.clone(), field.name.clone());
                let value = match self.statics.get(&key) {
                    Some(value) => *value,
                    // library objects such as `System.out`
                    None if !field.ty.is_primitive() && !field.ty.is_string() => {
                        let class = field.ty.class_name().unwrap_or("java.lang.Object").to_string();
                        self.object(&class)
                    }
                    None => default_of(&field.ty),
                };
                self.push(value);
            }
            Op::PutStatic(field) => {
                let value = self.pop();
                self.statics.insert((field.owner.clone(), field.name.clone()), value);
            }
            Op::GetField(field) => {
                let Value::Ref(object) = self.word() else {
                    return self.exception("java.lang.NullPointerException");
                };
                let value = self
                    .fields
                    .get(&(object, field.name.clone()))
                    .copied()
                    .unwrap_or_else(|| default_of(&field.ty));
                self.push(value);
            }
            Op::PutField(field) => {
                let value = self.pop();
                let Value::Ref(object) = self.word() else {
                    return self.exception("java.lang.NullPointerException");
                };
                self.fields.insert((object, field.name.clone()), value);
            }
            Op::InvokeVirtual(method)
            | Op::InvokeSpecial(method)
            | Op::InvokeStatic(method)
            | Op::InvokeInterface(method) => return self.invoke(method),
            Op::New(class) => {
                let object = match class.as_str() {
                    "java.lang.StringBuilder" => Object::Builder(String::new()),
                    _ => Object::Instance {
                        class: class.clone(),
                        message: None,
                    },
                };
                let value = self.alloc(object);
                self.push(value);
            }
            Op::NewArray(elem) | Op::ANewArray(elem) => {
                let len = self.pop_int();
                if len < 0 {
                    return self.exception("java.lang.NegativeArraySizeException");
                }
                let value = self.alloc(Object::Array(vec![default_of(elem); len as usize]));
                self.push(value);
            }
            Op::MultiANewArray(ty, dims) => {
                let mut lens: Vec<i32> = (0..*dims).map(|_| self.pop_int()).collect();
                lens.reverse();
                let value = self.multi_array(ty, &lens);
                self.push(value);
            }
            Op::ArrayLength => {
                let array = self.pop();
                if array == Value::Null {
                    return self.exception("java.lang.NullPointerException");
                }
                match self.heap(array) {
                    Object::Array(elems) => {
                        let len = elems.len() as i32;
                        self.push(Value::Int(len));
                    }
                    other => panic!("arraylength of {:?}", other),
                }
            }
            Op::AThrow => {
                let exception = self.word();
                if exception == Value::Null {
                    return self.exception("java.lang.NullPointerException");
                }
                return Step::Throw(exception);
            }
            Op::CheckCast(ty) => {
                let value = self.word();
                self.stack.push(value);
                if value != Value::Null && !self.instance_of(value, ty) {
                    return self.exception("java.lang.ClassCastException");
                }
            }
            Op::InstanceOf(ty) => {
                let value = self.word();
                let result = value != Value::Null && self.instance_of(value, ty);
                self.push(Value::Int(i32::from(result)));
            }
            Op::MonitorEnter | Op::MonitorExit => {
                let Value::Ref(object) = self.word() else {
                    return self.exception("java.lang.NullPointerException");
                };
                let delta = if *op == Op::MonitorEnter { 1 } else { -1 };
                *self.monitors.entry(object).or_insert(0) += delta;
                self.log.push(if delta > 0 { "monitorenter" } else { "monitorexit" }.to_string());
            }
        }
        Step::Next
    }

    /// Duplicate the top `words` and insert them under `under` more words
    fn dup_words(&mut self, words: usize, under: usize) {
        let len = self.stack.len();
        let top: Vec<Value> = self.stack[len - words..].to_vec();
        let at = len - words - under;
        for (offset, value) in top.into_iter().enumerate() {
            self.stack.insert(at + offset, value);
        }
    }

    fn multi_array(&mut self, ty: &DataType, lens: &[i32]) -> Value {
        let elem = ty.element().cloned().unwrap_or(DataType::Unknown);
        let len = lens[0].max(0) as usize;
        let elems = if lens.len() == 1 {
            vec![default_of(&elem); len]
        } else {
            (0..len).map(|_| self.multi_array(&elem, &lens[1..])).collect()
        };
        self.alloc(Object::Array(elems))
    }

    fn instance_of(&self, value: Value, ty: &DataType) -> bool {
        match (self.heap(value), ty.class_name()) {
            (Object::Array(_), target) => target.map_or(true, |name| name == "java.lang.Object"),
            (_, Some(name)) => self.env.is_subclass(&self.class_of(value), name),
            _ => false,
        }
    }

    /// Rendering used by `append` and `println`
    fn render(&self, value: Value, ty: &DataType) -> String {
        match (ty, value) {
            (DataType::Boolean, Value::Int(v)) => (v != 0).to_string(),
            (DataType::Char, Value::Int(v)) => char::from_u32(v as u32).map(String::from).unwrap_or_default(),
            (_, Value::Int(v)) => v.to_string(),
            (_, Value::Long(v)) => v.to_string(),
            (_, Value::Float(v)) => format!("{:?}", v),
            (_, Value::Double(v)) => format!("{:?}", v),
            (_, Value::Null) => "null".to_string(),
            (_, Value::Ref(_)) => match self.heap(value) {
                Object::Str(text) | Object::Builder(text) => text.clone(),
                Object::Instance { class, message } => match message {
                    Some(message) => format!("{}: {}", class, message),
                    None => class.clone(),
                },
                Object::Array(_) => "[array".to_string(),
            },
            (_, other) => panic!("cannot render {:?}", other),
        }
    }

    fn invoke(&mut self, method: &MethodRef) -> Step {
        let mut args: Vec<Value> = method.params.iter().map(|_| self.pop()).collect();
        args.reverse();
        let receiver = if method.is_static { None } else { Some(self.word()) };
        if receiver == Some(Value::Null) {
            return self.exception("java.lang.NullPointerException");
        }

        let result = match (method.owner.as_str(), method.name.as_str()) {
            ("java.lang.StringBuilder", "<init>") => {
                let seed = args.first().map(|arg| self.render(*arg, &DataType::string()));
                if let (Some(Value::Ref(at)), Some(seed)) = (receiver, seed) {
                    self.heap[at] = Object::Builder(seed);
                }
                None
            }
            ("java.lang.StringBuilder", "append") => {
                let text = self.render(args[0], &method.params[0]);
                let Some(Value::Ref(at)) = receiver else { unreachable!() };
                if let Object::Builder(buffer) = &mut self.heap[at] {
                    buffer.push_str(&text);
                }
                receiver
            }
            (_, "toString") => {
                let text = self.render(receiver.unwrap_or(Value::Null), &DataType::object());
                Some(self.string(&text))
            }
            ("java.lang.String", "length") => {
                let len = self.text(receiver.unwrap_or(Value::Null)).chars().count();
                Some(Value::Int(len as i32))
            }
            ("java.lang.String", "valueOf") => {
                let text = self.render(args[0], &method.params[0]);
                Some(self.string(&text))
            }
            ("java.lang.String", "equals") => {
                let this = self.text(receiver.unwrap_or(Value::Null));
                let equal = match args[0] {
                    Value::Ref(_) => matches!(self.heap(args[0]), Object::Str(other) if *other == this),
                    _ => false,
                };
                Some(Value::Int(i32::from(equal)))
            }
            ("java.io.PrintStream", "println") => {
                let line = args
                    .first()
                    .map(|arg| self.render(*arg, &method.params[0]))
                    .unwrap_or_default();
                self.log.push(line);
                None
            }
            (_, "<init>") => {
                if let (Some(Value::Ref(at)), Some(arg)) = (receiver, args.first()) {
                    let text = self.render(*arg, &DataType::string());
                    if let Object::Instance { message, .. } = &mut self.heap[at] {
                        *message = Some(text);
                    }
                }
                None
            }
            (_, "getMessage") => {
                let message = match self.heap(receiver.unwrap_or(Value::Null)) {
                    Object::Instance { message, .. } => message.clone(),
                    _ => None,
                };
                Some(match message {
                    Some(text) => self.string(&text),
                    None => Value::Null,
                })
            }
            ("demo.Probe", "hit") => {
                let text = self.render(args[0], &method.params[0]);
                self.log.push(text);
                None
            }
            ("demo.Probe", "flag") => Some(Value::Int(i32::from(self.flag))),
            ("demo.Probe", "value") => Some(Value::Int(self.value)),
            ("demo.Probe", "fail") => return self.exception("java.io.IOException"),
            ("demo.Probe", "boom") => return self.exception("java.lang.IllegalStateException"),
            ("java.lang.Math", "max") => match (args[0], args[1]) {
                (Value::Int(a), Value::Int(b)) => Some(Value::Int(a.max(b))),
                (Value::Long(a), Value::Long(b)) => Some(Value::Long(a.max(b))),
                (Value::Double(a), Value::Double(b)) => Some(Value::Double(a.max(b))),
                other => panic!("Math.max on {:?}", other),
            },
            (owner, name) => panic!("call to {}.{} is not modelled", owner, name),
        };
        if let Some(value) = result {
            self.push(value);
        }
        Step::Next
    }
}

fn default_of(elem: &DataType) -> Value {
    match elem {
        DataType::Long => Value::Long(0),
        DataType::Float => Value::Float(0.0),
        DataType::Double => Value::Double(0.0),
        ty if ty.is_primitive() => Value::Int(0),
        _ => Value::Null,
    }
}

fn narrow_element(kind: ArrayKind, value: Value) -> Value {
    match (kind, value) {
        (ArrayKind::Byte, Value::Int(v)) => Value::Int(i32::from(v as i8)),
        (ArrayKind::Char, Value::Int(v)) => Value::Int(i32::from(v as u16)),
        (ArrayKind::Short, Value::Int(v)) => Value::Int(i32::from(v as i16)),
        _ => value,
    }
}

fn convert(value: Value, to: Kind) -> Value {
    match (value, to) {
        (Value::Int(v), Kind::Long) => Value::Long(i64::from(v)),
        (Value::Int(v), Kind::Float) => Value::Float(v as f32),
        (Value::Int(v), Kind::Double) => Value::Double(f64::from(v)),
        (Value::Long(v), Kind::Int) => Value::Int(v as i32),
        (Value::Long(v), Kind::Float) => Value::Float(v as f32),
        (Value::Long(v), Kind::Double) => Value::Double(v as f64),
        (Value::Float(v), Kind::Int) => Value::Int(v as i32),
        (Value::Float(v), Kind::Long) => Value::Long(v as i64),
        (Value::Float(v), Kind::Double) => Value::Double(f64::from(v)),
        (Value::Double(v), Kind::Int) => Value::Int(v as i32),
        (Value::Double(v), Kind::Long) => Value::Long(v as i64),
        (Value::Double(v), Kind::Float) => Value::Float(v as f32),
        (other, to) => panic!("conversion of {:?} to {:?}", other, to),
    }
}

fn arithmetic(kind: Kind, arith: Arith, left: Value, right: Value) -> Option<Value> {
    Some(match (kind, left, right) {
        (Kind::Int, Value::Int(a), Value::Int(b)) => Value::Int(match arith {
            Arith::Add => a.wrapping_add(b),
            Arith::Sub => a.wrapping_sub(b),
            Arith::Mul => a.wrapping_mul(b),
            Arith::Div => a.checked_div(b).or_else(|| (b == -1).then(|| a.wrapping_neg()))?,
            Arith::Rem => a.checked_rem(b).or_else(|| (b == -1).then_some(0))?,
            Arith::Shl => a.wrapping_shl(b as u32),
            Arith::Shr => a.wrapping_shr(b as u32),
            Arith::UShr => ((a as u32).wrapping_shr(b as u32)) as i32,
            Arith::And => a & b,
            Arith::Or => a | b,
            Arith::Xor => a ^ b,
        }),
        (Kind::Long, Value::Long(a), Value::Int(b)) => Value::Long(match arith {
            Arith::Shl => a.wrapping_shl(b as u32),
            Arith::Shr => a.wrapping_shr(b as u32),
            Arith::UShr => ((a as u64).wrapping_shr(b as u32)) as i64,
            other => panic!("long {:?} with an int operand", other),
        }),
        (Kind::Long, Value::Long(a), Value::Long(b)) => Value::Long(match arith {
            Arith::Add => a.wrapping_add(b),
            Arith::Sub => a.wrapping_sub(b),
            Arith::Mul => a.wrapping_mul(b),
            Arith::Div => a.checked_div(b).or_else(|| (b == -1).then(|| a.wrapping_neg()))?,
            Arith::Rem => a.checked_rem(b).or_else(|| (b == -1).then_some(0))?,
            Arith::And => a & b,
            Arith::Or => a | b,
            Arith::Xor => a ^ b,
            other => panic!("long {:?} with a long shift count", other),
        }),
        (Kind::Float, Value::Float(a), Value::Float(b)) => Value::Float(match arith {
            Arith::Add => a + b,
            Arith::Sub => a - b,
            Arith::Mul => a * b,
            Arith::Div => a / b,
            Arith::Rem => a % b,
            other => panic!("float {:?}", other),
        }),
        (Kind::Double, Value::Double(a), Value::Double(b)) => Value::Double(match arith {
            Arith::Add => a + b,
            Arith::Sub => a - b,
            Arith::Mul => a * b,
            Arith::Div => a / b,
            Arith::Rem => a % b,
            other => panic!("double {:?}", other),
        }),
        other => panic!("arithmetic on {:?}", other),
    })
}
