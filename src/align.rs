/// Rounds a byte count up to the next multiple of the machine word.
///
/// Header fields are machine words, so keeping every block length a multiple
/// of the word keeps every header and payload inside a word aligned arena
/// aligned as well.
///
/// # Examples
///
/// ```rust
/// use freelist_alloc::align;
///
/// match core::mem::size_of::<usize>() {
///     8 => assert_eq!(align!(13), 16), // 64 bit machine.
///     4 => assert_eq!(align!(11), 12), // 32 bit machine.
///     _ => {},
/// };
/// assert_eq!(align!(0), 0);
/// ```
#[macro_export]
macro_rules! align {
  ($value:expr) => {
    ($value + ::core::mem::size_of::<usize>() - 1) & !(::core::mem::size_of::<usize>() - 1)
  };
}
