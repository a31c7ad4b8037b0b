//! Build-time code generation for the `memsweep` kernel layer.
//!
//! Every macro in this crate expands to items that refer to `crate::...` paths, and is therefore
//! only meant to be invoked from within the `memsweep` crate itself.

use proc_macro::TokenStream;
use proc_macro2::{Literal, Span, TokenStream as TokenStream2};
use quote::{format_ident, quote};
use syn::parse::{Parse, ParseStream};
use syn::punctuated::Punctuated;
use syn::{bracketed, parse_macro_input, Ident, LitInt, Token};

/// The largest unroll factor for which `unroll_impls!` will emit an implementation.
const MAX_UNROLL: u32 = 512;

/// A comma-separated list of integer literals, e.g. `1, 2, 4`.
struct IntList(Vec<(u32, Span)>);

impl Parse for IntList {
    fn parse(input: ParseStream) -> syn::Result<Self> {
        let lits = Punctuated::<LitInt, Token![,]>::parse_terminated(input)?;
        let values = lits
            .iter()
            .map(|lit| Ok((lit.base10_parse::<u32>()?, lit.span())))
            .collect::<syn::Result<Vec<_>>>()?;
        Ok(IntList(values))
    }
}

impl IntList {
    /// Parses a `[1, 2, 4]` style list.
    fn parse_bracketed(input: ParseStream) -> syn::Result<Self> {
        let content;
        bracketed!(content in input);
        content.parse()
    }

    fn values(&self) -> impl Iterator<Item = u32> + '_ {
        self.0.iter().map(|(value, _)| *value)
    }
}

/// Returns an error for the first entry in `list` that isn't zero or a power of two.
fn check_powers_of_two(list: &IntList, allow_zero: bool) -> syn::Result<()> {
    for &(value, span) in &list.0 {
        if !(value.is_power_of_two() || (allow_zero && value == 0)) {
            return Err(syn::Error::new(
                span,
                format!("{value} is not a power of two"),
            ));
        }
    }
    Ok(())
}

/// Emits an implementation of `crate::delay::Delay` for `crate::delay::Spin<K>`, for each `K` in
/// the given list of delay levels.
///
/// The implementation for level `K` consists of a single inline assembly block holding `K`
/// register increments, where each increment depends on the result of the previous one. The
/// chain never touches memory, can't be collapsed by the optimizer (it never looks inside an
/// `asm!` block), and since the block isn't marked `nomem` the compiler also won't move any
/// loads or stores across it.
///
/// Targets without a known assembly syntax fall back to a loop that launders the accumulator
/// through [core::hint::black_box] on every step. Level 0 emits an empty function.
///
/// ```ignore
/// delay_impls!(0, 1, 2, 4);
/// ```
#[proc_macro]
pub fn delay_impls(input: TokenStream) -> TokenStream {
    let levels = parse_macro_input!(input as IntList);
    if let Err(err) = check_powers_of_two(&levels, true) {
        return err.to_compile_error().into();
    }
    let impls = levels.values().map(|units| {
        let units_lit = Literal::u32_unsuffixed(units);
        let delay_fns = delay_fns(units);
        quote! {
            impl crate::delay::Delay for crate::delay::Spin<#units_lit> {
                const UNITS: u32 = #units_lit;
                #delay_fns
            }
        }
    });
    quote!(#(#impls)*).into()
}

/// Generates the `fn delay()` variants for each supported target architecture.
fn delay_fns(units: u32) -> TokenStream2 {
    if units == 0 {
        return quote! {
            #[inline(always)]
            fn delay() {}
        };
    }
    let count = units as usize;
    let x86 = vec!["add {acc}, 1"; count];
    let aarch64 = vec!["add {acc}, {acc}, #1"; count];
    let riscv = vec!["addi {acc}, {acc}, 1"; count];
    let units_lit = Literal::u32_unsuffixed(units);
    quote! {
        #[cfg(any(target_arch = "x86", target_arch = "x86_64"))]
        #[inline(always)]
        fn delay() {
            unsafe {
                ::core::arch::asm!(#(#x86),*, acc = inout(reg) 0usize => _, options(nostack));
            }
        }

        #[cfg(target_arch = "aarch64")]
        #[inline(always)]
        fn delay() {
            unsafe {
                ::core::arch::asm!(#(#aarch64),*, acc = inout(reg) 0usize => _, options(nostack));
            }
        }

        #[cfg(any(target_arch = "riscv32", target_arch = "riscv64"))]
        #[inline(always)]
        fn delay() {
            unsafe {
                ::core::arch::asm!(#(#riscv),*, acc = inout(reg) 0usize => _, options(nostack));
            }
        }

        #[cfg(not(any(
            target_arch = "x86",
            target_arch = "x86_64",
            target_arch = "aarch64",
            target_arch = "riscv32",
            target_arch = "riscv64"
        )))]
        #[inline(always)]
        fn delay() {
            let mut acc = 0usize;
            for _ in 0..#units_lit {
                acc = ::core::hint::black_box(acc.wrapping_add(1));
            }
        }
    }
}

/// Emits an implementation of `crate::unroll::Unroll` for `crate::unroll::Unrolled<N>`, for each
/// `N` in the given list of unroll factors. The `repeat` method of the implementation for `N`
/// consists of exactly `N` literal calls of the loop body.
///
/// ```ignore
/// unroll_impls!(1, 2, 4, 8);
/// ```
#[proc_macro]
pub fn unroll_impls(input: TokenStream) -> TokenStream {
    let factors = parse_macro_input!(input as IntList);
    if let Err(err) = check_powers_of_two(&factors, false) {
        return err.to_compile_error().into();
    }
    if let Some(&(factor, span)) = factors.0.iter().find(|(factor, _)| *factor > MAX_UNROLL) {
        return syn::Error::new(span, format!("unroll factor {factor} exceeds {MAX_UNROLL}"))
            .to_compile_error()
            .into();
    }
    let impls = factors.values().map(|factor| {
        let factor_lit = Literal::usize_unsuffixed(factor as usize);
        let calls = (0..factor).map(|_| quote!(body();));
        quote! {
            impl crate::unroll::Unroll for crate::unroll::Unrolled<#factor_lit> {
                const FACTOR: usize = #factor_lit;
                #[inline(always)]
                fn repeat<F: FnMut()>(mut body: F) {
                    #(#calls)*
                }
            }
        }
    });
    quote!(#(#impls)*).into()
}

/// The parsed input of [kernel_table].
struct TableSpec {
    unroll_budget: (u32, Span),
    delays: IntList,
    strides: IntList,
}

/// Parses `name: <value>` where the name must match `expected`.
fn parse_field<T>(
    input: ParseStream,
    expected: &str,
    parse_value: impl FnOnce(ParseStream) -> syn::Result<T>,
) -> syn::Result<T> {
    let name: Ident = input.parse()?;
    if name != expected {
        return Err(syn::Error::new(
            name.span(),
            format!("expected `{expected}`, found `{name}`"),
        ));
    }
    input.parse::<Token![:]>()?;
    let value = parse_value(input)?;
    // The trailing comma is optional for the last field.
    if !input.is_empty() {
        input.parse::<Token![,]>()?;
    }
    Ok(value)
}

impl Parse for TableSpec {
    fn parse(input: ParseStream) -> syn::Result<Self> {
        let unroll_budget = parse_field(input, "unroll_budget", |input| {
            let lit: LitInt = input.parse()?;
            Ok((lit.base10_parse::<u32>()?, lit.span()))
        })?;
        let delays = parse_field(input, "delays", IntList::parse_bracketed)?;
        let strides = parse_field(input, "strides", IntList::parse_bracketed)?;
        Ok(TableSpec {
            unroll_budget,
            delays,
            strides,
        })
    }
}

impl TableSpec {
    /// The unroll factor used by table kernels at the given delay level: the budget is split
    /// across the delay units, so that every loop body holds roughly the same number of
    /// instructions regardless of the delay level.
    fn unroll_for(&self, delay: u32) -> u32 {
        (self.unroll_budget.0 / delay.max(1)).max(1)
    }
}

/// Emits the kernel table of the `crate::selector` module: a `lookup` function mapping every
/// `KernelKey` to a `KernelPair` of real and dummy kernels, a `unroll_factor` function, and a
/// `MAX_GRANULARITY_WORDS` constant.
///
/// The generated `match` lists every combination explicitly, so if the delay or stride lists
/// passed to this macro don't cover every `DelayLevel`/`Stride` variant the build fails with a
/// non-exhaustive match error.
///
/// ```ignore
/// kernel_table! {
///     unroll_budget: 512,
///     delays: [0, 1, 2, 4, 8, 16, 32, 64, 128, 256],
///     strides: [2, 4, 8, 16],
/// }
/// ```
#[proc_macro]
pub fn kernel_table(input: TokenStream) -> TokenStream {
    let spec = parse_macro_input!(input as TableSpec);
    let (budget, budget_span) = spec.unroll_budget;
    if !budget.is_power_of_two() || budget > MAX_UNROLL {
        return syn::Error::new(
            budget_span,
            format!("the unroll budget must be a power of two no larger than {MAX_UNROLL}"),
        )
        .to_compile_error()
        .into();
    }
    if let Err(err) = check_powers_of_two(&spec.delays, true)
        .and_then(|_| check_powers_of_two(&spec.strides, false))
    {
        return err.to_compile_error().into();
    }

    let operations = [
        (format_ident!("Read"), quote!(crate::access::Read)),
        (format_ident!("Write"), quote!(crate::access::Write)),
    ];
    let directions = [
        (format_ident!("Forward"), quote!(crate::kernels::Forward)),
        (format_ident!("Reverse"), quote!(crate::kernels::Reverse)),
    ];

    let mut arms = Vec::new();
    for delay in spec.delays.values() {
        let level = format_ident!("D{}", delay);
        let delay_lit = Literal::u32_unsuffixed(delay);
        let unroll_lit = Literal::usize_unsuffixed(spec.unroll_for(delay) as usize);
        let spin = quote!(crate::delay::Spin<#delay_lit>);
        let unroll = quote!(crate::unroll::Unrolled<#unroll_lit>);

        for (operation, access) in &operations {
            // Random chases have no direction, so both directions map to the same pair.
            arms.push(quote! {
                (Pattern::RandomChase, Operation::#operation, _, DelayLevel::#level) => {
                    KernelPair::new(
                        key,
                        #unroll_lit,
                        crate::kernels::chase::<#access, #spin, #unroll>,
                        crate::kernels::chase::<crate::access::Skip, #spin, #unroll>,
                    )
                }
            });
            for (direction, walk) in &directions {
                arms.push(quote! {
                    (Pattern::Sequential, Operation::#operation, Direction::#direction, DelayLevel::#level) => {
                        KernelPair::new(
                            key,
                            #unroll_lit,
                            crate::kernels::sequential::<#access, #spin, #unroll, #walk>,
                            crate::kernels::sequential::<crate::access::Skip, #spin, #unroll, #walk>,
                        )
                    }
                });
                for stride in spec.strides.values() {
                    let variant = format_ident!("S{}", stride);
                    let stride_lit = Literal::usize_unsuffixed(stride as usize);
                    arms.push(quote! {
                        (
                            Pattern::Strided(Stride::#variant),
                            Operation::#operation,
                            Direction::#direction,
                            DelayLevel::#level,
                        ) => {
                            KernelPair::new(
                                key,
                                #unroll_lit,
                                crate::kernels::strided::<#access, #spin, #unroll, #walk, #stride_lit>,
                                crate::kernels::strided::<crate::access::Skip, #spin, #unroll, #walk, #stride_lit>,
                            )
                        }
                    });
                }
            }
        }
    }

    let unroll_arms = spec.delays.values().map(|delay| {
        let level = format_ident!("D{}", delay);
        let unroll_lit = Literal::usize_unsuffixed(spec.unroll_for(delay) as usize);
        quote!(DelayLevel::#level => #unroll_lit,)
    });

    let max_stride = spec.strides.values().max().unwrap_or(1).max(1);
    let max_unroll = spec
        .delays
        .values()
        .map(|delay| spec.unroll_for(delay))
        .max()
        .unwrap_or(1);
    let max_granularity = Literal::usize_unsuffixed((max_stride * max_unroll) as usize);

    quote! {
        /// The largest granularity, in words, of any kernel in the table. A region whose length
        /// is a multiple of this can be used with every kernel.
        pub const MAX_GRANULARITY_WORDS: usize = #max_granularity;

        /// Returns the unroll factor that the table's kernels use at the given delay level.
        pub const fn unroll_factor(delay: DelayLevel) -> usize {
            match delay {
                #(#unroll_arms)*
            }
        }

        fn lookup(key: KernelKey) -> KernelPair {
            match (key.pattern, key.operation, key.direction, key.delay) {
                #(#arms)*
            }
        }
    }
    .into()
}
