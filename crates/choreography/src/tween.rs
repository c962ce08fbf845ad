use glam::{Vec2, Vec3};

/// A unit of timeline work applied against a context `C`.
///
/// `begin` runs once, the first tick the entry becomes active, and is where
/// start values are captured. `apply` receives the eased progress in `[0, 1]`.
pub trait Action<C> {
    fn begin(&mut self, ctx: &mut C);
    fn apply(&mut self, ctx: &mut C, progress: f32);
}

/// Values that can be interpolated and offset.
pub trait Tweenable: Clone {
    fn lerp(&self, to: &Self, t: f32) -> Self;
    fn offset(&self, by: &Self) -> Self;
}

impl Tweenable for f32 {
    fn lerp(&self, to: &Self, t: f32) -> Self {
        self + (to - self) * t
    }

    fn offset(&self, by: &Self) -> Self {
        self + by
    }
}

impl Tweenable for Vec2 {
    fn lerp(&self, to: &Self, t: f32) -> Self {
        Vec2::lerp(*self, *to, t)
    }

    fn offset(&self, by: &Self) -> Self {
        *self + *by
    }
}

impl Tweenable for Vec3 {
    fn lerp(&self, to: &Self, t: f32) -> Self {
        Vec3::lerp(*self, *to, t)
    }

    fn offset(&self, by: &Self) -> Self {
        *self + *by
    }
}

/// Where a tween ends up.
#[derive(Debug, Clone, PartialEq)]
pub enum Target<T> {
    To(T),
    /// Relative to the value read when the tween starts (`"+=" / "-="`).
    By(T),
}

type Reader<C, T> = Box<dyn Fn(&C) -> T>;
type Writer<C, T> = Box<dyn FnMut(&mut C, T)>;
type Hook<C> = Box<dyn FnMut(&mut C)>;

/// Read/write accessors for one animatable property of `C`.
pub struct Property<C, T> {
    read: Reader<C, T>,
    write: Writer<C, T>,
}

impl<C, T> Property<C, T> {
    pub fn new(read: impl Fn(&C) -> T + 'static, write: impl FnMut(&mut C, T) + 'static) -> Self {
        Self {
            read: Box::new(read),
            write: Box::new(write),
        }
    }
}

pub struct Tween<C, T> {
    property: Property<C, T>,
    target: Target<T>,
    resolved: Option<(T, T)>,
    on_update: Option<Hook<C>>,
}

impl<C, T: Tweenable> Tween<C, T> {
    pub fn new(property: Property<C, T>, target: Target<T>) -> Self {
        Self {
            property,
            target,
            resolved: None,
            on_update: None,
        }
    }

    pub fn to(property: Property<C, T>, value: T) -> Self {
        Self::new(property, Target::To(value))
    }

    pub fn by(property: Property<C, T>, delta: T) -> Self {
        Self::new(property, Target::By(delta))
    }

    /// Runs after every write, with the freshly written state visible.
    pub fn on_update(mut self, hook: impl FnMut(&mut C) + 'static) -> Self {
        self.on_update = Some(Box::new(hook));
        self
    }
}

impl<C, T: Tweenable> Action<C> for Tween<C, T> {
    fn begin(&mut self, ctx: &mut C) {
        let from = (self.property.read)(ctx);
        let to = match &self.target {
            Target::To(value) => value.clone(),
            Target::By(delta) => from.offset(delta),
        };
        self.resolved = Some((from, to));
    }

    fn apply(&mut self, ctx: &mut C, progress: f32) {
        let Some((from, to)) = &self.resolved else {
            return;
        };
        (self.property.write)(ctx, from.lerp(to, progress));
        if let Some(hook) = self.on_update.as_mut() {
            hook(ctx);
        }
    }
}

type SliceAccess<C> = Box<dyn FnMut(&mut C) -> &mut [f32]>;

/// Interpolates a whole attribute array towards `target` with one shared progress.
///
/// The accessor is called with the target length and must return a slice of
/// exactly that many floats.
pub struct ArrayTween<C> {
    access: SliceAccess<C>,
    target: Vec<f32>,
    start: Vec<f32>,
    on_update: Option<Hook<C>>,
}

impl<C> ArrayTween<C> {
    pub fn new(access: impl FnMut(&mut C) -> &mut [f32] + 'static, target: Vec<f32>) -> Self {
        Self {
            access: Box::new(access),
            target,
            start: Vec::new(),
            on_update: None,
        }
    }

    pub fn on_update(mut self, hook: impl FnMut(&mut C) + 'static) -> Self {
        self.on_update = Some(Box::new(hook));
        self
    }

    pub fn len(&self) -> usize {
        self.target.len()
    }

    pub fn is_empty(&self) -> bool {
        self.target.is_empty()
    }
}

impl<C> Action<C> for ArrayTween<C> {
    fn begin(&mut self, ctx: &mut C) {
        let slice = (self.access)(ctx);
        let len = slice.len().min(self.target.len());
        self.start = slice[..len].to_vec();
    }

    fn apply(&mut self, ctx: &mut C, progress: f32) {
        let slice = (self.access)(ctx);
        for ((out, from), to) in slice.iter_mut().zip(&self.start).zip(&self.target) {
            *out = from + (to - from) * progress;
        }
        if let Some(hook) = self.on_update.as_mut() {
            hook(ctx);
        }
    }
}

/// Zero-length entry that runs a callback once.
pub struct Call<C> {
    callback: Option<Box<dyn FnOnce(&mut C)>>,
}

impl<C> Call<C> {
    pub fn new(callback: impl FnOnce(&mut C) + 'static) -> Self {
        Self {
            callback: Some(Box::new(callback)),
        }
    }
}

impl<C> Action<C> for Call<C> {
    fn begin(&mut self, ctx: &mut C) {
        if let Some(callback) = self.callback.take() {
            callback(ctx);
        }
    }

    fn apply(&mut self, _ctx: &mut C, _progress: f32) {}
}
