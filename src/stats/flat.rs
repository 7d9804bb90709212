use crate::image::{ComponentValue, SharedBuffer};

/// All samples of a vector image as one flat scalar sequence.
///
/// Holds an alias of the image storage, never a copy. A new view is made
/// whenever the wrapper replaces its image.
#[derive(Clone, Debug)]
pub struct FlattenedView<T> {
    buffer: SharedBuffer<T>,
}

impl<T: ComponentValue> FlattenedView<T> {
    pub fn new(buffer: &SharedBuffer<T>) -> Self {
        Self {
            buffer: buffer.clone(),
        }
    }

    pub fn len(&self) -> usize {
        self.buffer.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buffer.is_empty()
    }

    /// Run `f` over the samples while the storage is borrowed.
    pub fn with_samples<R>(&self, f: impl FnOnce(&[T]) -> R) -> R {
        f(&self.buffer.borrow())
    }

    pub fn aliases(&self, buffer: &SharedBuffer<T>) -> bool {
        self.buffer.ptr_eq(buffer)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn view_sees_writes_through_the_buffer() {
        let buffer = SharedBuffer::new(vec![1u8, 2, 3, 4]);
        let view = FlattenedView::new(&buffer);
        buffer.borrow_mut()[2] = 9;
        assert_eq!(view.with_samples(|s| s.to_vec()), vec![1, 2, 9, 4]);
        assert!(view.aliases(&buffer));
        assert_eq!(view.len(), 4);
    }
}
